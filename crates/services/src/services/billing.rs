//! Charges, subscriptions and payment status mirrored from the payment provider.

use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use db::models::{
    child::Child,
    invoice::{CreateInvoice, Invoice, InvoiceInstallment, InvoiceStatus},
    subscription::Subscription,
    validation::ValidationError,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{error, info, warn};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    coupons::{CouponError, CouponService},
    installments::{self, InstallmentError},
    payment_gateway::{
        Balance, BillingType, GatewayPayment, NewCustomer, NewPayment, NewSubscription,
        PaymentGateway, PaymentGatewayError,
    },
};

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("payment gateway error: {0}")]
    Gateway(#[from] PaymentGatewayError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Coupon(#[from] CouponError),
    #[error(transparent)]
    Installment(#[from] InstallmentError),
    #[error("invoice not found")]
    InvoiceNotFound,
    #[error("subscription not found")]
    SubscriptionNotFound,
    #[error("child not found")]
    ChildNotFound,
    #[error("invoice already charged")]
    AlreadyCharged,
    #[error("invoice has not been charged yet")]
    NotCharged,
    #[error("invoice is {0} and cannot be charged")]
    NotChargeable(InvoiceStatus),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ChargeResult {
    pub invoice: Invoice,
    pub installments: Vec<InvoiceInstallment>,
}

/// Next date with day-of-month `billing_day`, today included.
pub fn next_billing_date(today: NaiveDate, billing_day: u32) -> NaiveDate {
    let this_month = today.with_day(billing_day);
    match this_month {
        Some(date) if date >= today => date,
        _ => utils::date::add_months(utils::date::month_start(today), 1)
            .with_day(billing_day)
            .unwrap_or(today),
    }
}

pub struct BillingService {
    pool: SqlitePool,
    gateway: Arc<dyn PaymentGateway>,
}

impl BillingService {
    pub fn new(pool: SqlitePool, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { pool, gateway }
    }

    /// Create a local invoice, redeeming the coupon when one is given.
    pub async fn create_invoice(
        pool: &SqlitePool,
        data: &CreateInvoice,
        now: DateTime<Utc>,
    ) -> Result<Invoice, BillingError> {
        data.validate()?;
        if Child::find_by_id(pool, data.child_id).await?.is_none() {
            return Err(BillingError::ChildNotFound);
        }

        let code = data.coupon_code.as_deref().filter(|c| !c.trim().is_empty());
        let (coupon_id, discount) = match code {
            Some(code) => {
                let applied = CouponService::redeem(pool, code, data.amount, now).await?;
                (Some(applied.coupon_id), applied.discount_amount)
            }
            None => (None, 0.0),
        };

        let invoice = Invoice::create(pool, data, coupon_id, discount, Uuid::new_v4()).await?;
        info!(
            invoice_id = %invoice.id,
            child_id = %invoice.child_id,
            amount = invoice.amount,
            discount = invoice.discount_amount,
            "Created invoice"
        );
        Ok(invoice)
    }

    /// Provider customer for the child's guardian, created on first use.
    pub async fn ensure_customer(&self, child: &Child) -> Result<String, BillingError> {
        if let Some(id) = child.payment_customer_id.as_deref().filter(|id| !id.is_empty()) {
            return Ok(id.to_string());
        }

        let customer = self
            .gateway
            .create_customer(&NewCustomer {
                name: child.guardian_name.clone(),
                cpf_cnpj: child.guardian_document.clone(),
                email: child.guardian_email.clone(),
                mobile_phone: child.guardian_phone.clone(),
                external_reference: Some(child.id.to_string()),
            })
            .await?;
        Child::set_payment_customer_id(&self.pool, child.id, &customer.id).await?;
        info!(child_id = %child.id, customer_id = %customer.id, "Created payment customer");
        Ok(customer.id)
    }

    /// Send the invoice to the provider, splitting it into installments when requested.
    ///
    /// The provider charge and the local installment rows are written in
    /// sequence; if saving an installment fails the charge is kept as is.
    pub async fn charge_invoice(
        &self,
        invoice_id: Uuid,
        billing_type: BillingType,
    ) -> Result<ChargeResult, BillingError> {
        let invoice = Invoice::find_by_id(&self.pool, invoice_id)
            .await?
            .ok_or(BillingError::InvoiceNotFound)?;
        if invoice.payment_id.is_some() {
            return Err(BillingError::AlreadyCharged);
        }
        if invoice.status != InvoiceStatus::Pending {
            return Err(BillingError::NotChargeable(invoice.status));
        }
        let child = Child::find_by_id(&self.pool, invoice.child_id)
            .await?
            .ok_or(BillingError::ChildNotFound)?;
        let customer = self.ensure_customer(&child).await?;

        let amount = invoice.amount_due();
        let count = invoice
            .installment_count
            .clamp(1, i64::from(installments::MAX_INSTALLMENTS)) as u32;
        let plan = installments::split(amount, count, invoice.due_date)?;

        let payment = self
            .gateway
            .create_payment(&NewPayment {
                customer,
                billing_type,
                value: amount,
                due_date: invoice.due_date,
                description: Some(invoice.description.clone()),
                external_reference: Some(invoice.id.to_string()),
                installment_count: (count > 1).then_some(count),
                installment_value: (count > 1).then(|| plan[0].amount),
            })
            .await?;

        Invoice::set_payment_mirror(
            &self.pool,
            invoice.id,
            &payment.id,
            payment.invoice_url.as_deref(),
        )
        .await?;
        info!(
            invoice_id = %invoice.id,
            payment_id = %payment.id,
            installments = count,
            "Invoice charged at payment provider"
        );

        let mut saved = Vec::new();
        if count > 1 {
            let provider_payments = match payment.installment.as_deref() {
                Some(installment_id) => self
                    .gateway
                    .installment_payments(installment_id)
                    .await
                    .unwrap_or_else(|e| {
                        warn!(invoice_id = %invoice.id, error = %e, "Could not list installment payments");
                        Vec::new()
                    }),
                None => Vec::new(),
            };

            for entry in &plan {
                let payment_id = installment_payment_id(&provider_payments, entry.number);
                match InvoiceInstallment::create(
                    &self.pool,
                    invoice.id,
                    i64::from(entry.number),
                    entry.amount,
                    entry.due_date,
                    payment_id,
                )
                .await
                {
                    Ok(row) => saved.push(row),
                    // The provider charge already exists; keep the rows that saved
                    Err(e) => error!(
                        invoice_id = %invoice.id,
                        installment = entry.number,
                        error = %e,
                        "Failed to save installment; charge left partially mirrored"
                    ),
                }
            }
        }

        let invoice = Invoice::find_by_id(&self.pool, invoice.id)
            .await?
            .ok_or(BillingError::InvoiceNotFound)?;
        Ok(ChargeResult {
            invoice,
            installments: saved,
        })
    }

    /// Poll the provider and mirror the payment status onto the invoice.
    pub async fn sync_invoice(&self, invoice_id: Uuid) -> Result<Invoice, BillingError> {
        let invoice = Invoice::find_by_id(&self.pool, invoice_id)
            .await?
            .ok_or(BillingError::InvoiceNotFound)?;
        let payment_id = invoice.payment_id.as_deref().ok_or(BillingError::NotCharged)?;

        let payment = self.gateway.get_payment(payment_id).await?;
        let status = payment.status.invoice_status();

        if let Some(installment_id) = payment.installment.as_deref() {
            let rows = InvoiceInstallment::find_by_invoice_id(&self.pool, invoice.id).await?;
            for p in self.gateway.installment_payments(installment_id).await? {
                let status = p.status.invoice_status();
                // Rows saved while the provider listing was unavailable have no payment id yet
                let unlinked = p.installment_number.and_then(|number| {
                    rows.iter()
                        .find(|r| r.number == i64::from(number) && r.payment_id.is_none())
                });
                match unlinked {
                    Some(row) => {
                        InvoiceInstallment::link_payment(&self.pool, row.id, &p.id, status).await?;
                        info!(
                            invoice_id = %invoice.id,
                            installment = row.number,
                            payment_id = %p.id,
                            "Linked installment to provider payment"
                        );
                    }
                    None => {
                        InvoiceInstallment::update_status_by_payment_id(&self.pool, &p.id, status)
                            .await?;
                    }
                }
            }
        }

        if status == invoice.status {
            return Ok(invoice);
        }
        info!(
            invoice_id = %invoice.id,
            from = %invoice.status,
            to = %status,
            "Invoice status changed at payment provider"
        );
        Invoice::update_status(&self.pool, invoice.id, status)
            .await?
            .ok_or(BillingError::InvoiceNotFound)
    }

    /// Fetch the PIX copy-and-paste payload and keep it on the invoice.
    pub async fn pix_code(&self, invoice_id: Uuid) -> Result<String, BillingError> {
        let invoice = Invoice::find_by_id(&self.pool, invoice_id)
            .await?
            .ok_or(BillingError::InvoiceNotFound)?;
        let payment_id = invoice.payment_id.as_deref().ok_or(BillingError::NotCharged)?;
        let qr = self.gateway.pix_qr_code(payment_id).await?;
        Invoice::set_pix_payload(&self.pool, invoice.id, &qr.payload).await?;
        Ok(qr.payload)
    }

    pub async fn balance(&self) -> Result<Balance, BillingError> {
        Ok(self.gateway.balance().await?)
    }

    /// Register the subscription as a monthly recurring charge at the provider.
    pub async fn activate_subscription(
        &self,
        subscription_id: Uuid,
        billing_type: BillingType,
        today: NaiveDate,
    ) -> Result<Subscription, BillingError> {
        let subscription = Subscription::find_by_id(&self.pool, subscription_id)
            .await?
            .ok_or(BillingError::SubscriptionNotFound)?;
        if subscription.provider_subscription_id.is_some() {
            return Ok(subscription);
        }
        let child = Child::find_by_id(&self.pool, subscription.child_id)
            .await?
            .ok_or(BillingError::ChildNotFound)?;
        let customer = self.ensure_customer(&child).await?;

        let remote = self
            .gateway
            .create_subscription(&NewSubscription {
                customer,
                billing_type,
                value: subscription.value,
                next_due_date: next_billing_date(
                    today,
                    subscription.billing_day.clamp(1, 28) as u32,
                ),
                cycle: "MONTHLY",
                description: Some(subscription.description.clone()),
                external_reference: Some(subscription.id.to_string()),
            })
            .await?;
        Subscription::set_provider_subscription_id(&self.pool, subscription.id, &remote.id)
            .await?;
        info!(
            subscription_id = %subscription.id,
            provider_subscription_id = %remote.id,
            "Subscription registered at payment provider"
        );

        Subscription::find_by_id(&self.pool, subscription.id)
            .await?
            .ok_or(BillingError::SubscriptionNotFound)
    }
}

fn installment_payment_id(payments: &[GatewayPayment], number: u32) -> Option<&str> {
    payments
        .iter()
        .find(|p| p.installment_number == Some(number))
        .map(|p| p.id.as_str())
}
