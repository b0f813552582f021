use ts_rs::TS;

fn generate_types_content() -> String {
    let header = "// This file was generated by `cargo run --bin generate_types`. Do not edit manually.\n";
    let decls: Vec<String> = vec![
        utils::response::ApiResponse::<()>::decl(),
        db::models::child::Child::decl(),
        db::models::child::CreateChild::decl(),
        db::models::daily_record::AttendanceStatus::decl(),
        db::models::daily_record::DailyRecord::decl(),
        db::models::daily_record::UpsertDailyRecord::decl(),
        db::models::daily_record::AttendanceEntry::decl(),
        db::models::message::SenderRole::decl(),
        db::models::message::Message::decl(),
        db::models::message::CreateMessage::decl(),
        db::models::announcement::Audience::decl(),
        db::models::announcement::Announcement::decl(),
        db::models::announcement::CreateAnnouncement::decl(),
        db::models::feed_post::FeedPost::decl(),
        db::models::feed_post::CreateFeedPost::decl(),
        db::models::invoice::InvoiceStatus::decl(),
        db::models::invoice::InvoiceDisplayStatus::decl(),
        db::models::invoice::Invoice::decl(),
        db::models::invoice::InvoiceWithStatus::decl(),
        db::models::invoice::CreateInvoice::decl(),
        db::models::invoice::UpdateInvoice::decl(),
        db::models::invoice::InvoiceFilter::decl(),
        db::models::invoice::InvoiceInstallment::decl(),
        db::models::subscription::SubscriptionStatus::decl(),
        db::models::subscription::Subscription::decl(),
        db::models::subscription::CreateSubscription::decl(),
        db::models::contract::ContractStatus::decl(),
        db::models::contract::Contract::decl(),
        db::models::contract::CreateContract::decl(),
        db::models::coupon::DiscountType::decl(),
        db::models::coupon::CouponStatus::decl(),
        db::models::coupon::DiscountCoupon::decl(),
        db::models::coupon::CouponWithStatus::decl(),
        db::models::coupon::CreateDiscountCoupon::decl(),
        db::models::fixed_expense::FixedExpense::decl(),
        db::models::fixed_expense::CreateFixedExpense::decl(),
        db::models::employee_profile::EmployeeProfile::decl(),
        db::models::employee_profile::CreateEmployeeProfile::decl(),
        db::models::nutrition::NutrientProfile::decl(),
        db::models::nutrition::MealType::decl(),
        db::models::nutrition::Ingredient::decl(),
        db::models::nutrition::CreateIngredient::decl(),
        db::models::nutrition::Meal::decl(),
        db::models::nutrition::CreateMeal::decl(),
        db::models::nutrition::CreateMealItem::decl(),
        db::models::nutrition::MealItemDetail::decl(),
        services::services::nutrition::ItemNutrition::decl(),
        services::services::nutrition::MealNutrition::decl(),
        services::services::nutrition::DayNutrition::decl(),
        services::services::nutrition::PeriodNutrition::decl(),
        services::services::forecast::ForecastInputs::decl(),
        services::services::forecast::ForecastMonth::decl(),
        services::services::forecast::Forecast::decl(),
        services::services::installments::InstallmentPlan::decl(),
        services::services::coupons::AppliedCoupon::decl(),
        services::services::billing::ChargeResult::decl(),
        services::services::payment_gateway::BillingType::decl(),
        services::services::payment_gateway::Balance::decl(),
        services::services::crm::Pipeline::decl(),
        services::services::crm::Stage::decl(),
        services::services::crm::Opportunity::decl(),
        services::services::crm::KanbanColumn::decl(),
        services::services::crm::KanbanBoard::decl(),
        services::services::events::ChangeKind::decl(),
        services::services::events::RealtimeEvent::decl(),
        services::services::storage::StoredFile::decl(),
        server::routes::invoices::InvoiceDetail::decl(),
        server::routes::invoices::InstallmentPreviewRequest::decl(),
        server::routes::billing::ChargeRequest::decl(),
        server::routes::billing::PixCode::decl(),
        server::routes::coupons::CouponPreviewRequest::decl(),
        server::routes::messages::UnreadCount::decl(),
        server::routes::pipeline::MoveOpportunity::decl(),
        server::routes::health::HealthStatus::decl(),
    ];

    let body = decls
        .into_iter()
        .map(|d| {
            let trimmed = d.trim_start();
            if trimmed.starts_with("export") {
                d
            } else {
                format!("export {trimmed}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("{header}\n{body}\n")
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let check_mode = args.iter().any(|arg| arg == "--check");
    let content = generate_types_content();

    let path = std::env::args()
        .skip(1)
        .find(|a| !a.starts_with("--"))
        .unwrap_or_else(|| "shared/types.ts".to_string());

    if check_mode {
        let current = std::fs::read_to_string(&path).unwrap_or_default();
        if current == content {
            println!("✅ {path} is up to date.");
            std::process::exit(0);
        }
        eprintln!("❌ {path} is not up to date. Please run 'cargo run --bin generate_types' and commit the changes.");
        std::process::exit(1);
    }

    if let Some(parent) = std::path::Path::new(&path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).expect("cannot create output directory");
        }
    }
    std::fs::write(&path, content).expect("unable to write types file");
    println!("✅ TypeScript types generated in {path}");
}
