//! Plain-text body of the enrolment contract sent for signature.

use chrono::NaiveDate;
use db::models::{child::Child, contract::Contract};

/// Brazilian currency format, e.g. `R$ 1.234,56`.
pub fn format_brl(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let (units, frac) = (cents / 100, cents % 100);

    let digits = units.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}R$ {grouped},{frac:02}")
}

fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

pub fn render(contract: &Contract, child: &Child) -> String {
    let guardian_doc = child
        .guardian_document
        .as_deref()
        .map(|doc| format!(", CPF {doc}"))
        .unwrap_or_default();
    let period = match contract.end_date {
        Some(end) => format!(
            "de {} a {}",
            format_date(contract.start_date),
            format_date(end)
        ),
        None => format!(
            "a partir de {}, por prazo indeterminado",
            format_date(contract.start_date)
        ),
    };
    let classroom = child
        .classroom
        .as_deref()
        .map(|c| format!(" na turma {c}"))
        .unwrap_or_default();

    let mut text = String::new();
    text.push_str(&contract.title.to_uppercase());
    text.push_str("\n\n");
    text.push_str(&format!(
        "CONTRATANTE: {}{guardian_doc}, responsável legal por {}, nascido(a) em {}.\n\n",
        child.guardian_name,
        child.full_name,
        format_date(child.birth_date),
    ));
    text.push_str(&format!(
        "CLÁUSULA 1 - OBJETO\nPrestação de serviços de educação infantil{classroom}, {period}.\n\n"
    ));
    text.push_str(&format!(
        "CLÁUSULA 2 - MENSALIDADE\nO CONTRATANTE pagará mensalmente o valor de {}, \
         conforme cobrança emitida pela CONTRATADA.\n\n",
        format_brl(contract.monthly_fee)
    ));
    text.push_str(
        "CLÁUSULA 3 - RESCISÃO\nQualquer das partes poderá rescindir este contrato \
         mediante aviso prévio de 30 dias.\n\n",
    );
    if let Some(allergies) = child.allergies.as_deref().filter(|a| !a.trim().is_empty()) {
        text.push_str(&format!(
            "CLÁUSULA 4 - SAÚDE\nO CONTRATANTE declara as seguintes restrições alimentares e alergias: {allergies}.\n\n"
        ));
    }
    text.push_str("Assinado eletronicamente pelas partes.\n");
    text
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use db::models::contract::ContractStatus;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_format_brl() {
        assert_eq!(format_brl(0.0), "R$ 0,00");
        assert_eq!(format_brl(950.5), "R$ 950,50");
        assert_eq!(format_brl(1234.56), "R$ 1.234,56");
        assert_eq!(format_brl(1_000_000.0), "R$ 1.000.000,00");
    }

    #[test]
    fn test_render_mentions_parties_and_fee() {
        let now = Utc::now();
        let child = Child {
            id: Uuid::new_v4(),
            full_name: "Laura Lima".into(),
            birth_date: NaiveDate::from_ymd_opt(2022, 8, 1).unwrap(),
            classroom: Some("Maternal I".into()),
            guardian_name: "Paula Lima".into(),
            guardian_email: None,
            guardian_phone: None,
            guardian_document: Some("123.456.789-09".into()),
            photo_url: None,
            allergies: None,
            notes: None,
            expected_arrival: None,
            payment_customer_id: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let contract = Contract {
            id: Uuid::new_v4(),
            child_id: child.id,
            title: "Contrato de matrícula 2026".into(),
            body: None,
            monthly_fee: 1450.0,
            start_date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            end_date: None,
            status: ContractStatus::Draft,
            document_token: None,
            sign_url: None,
            signed_at: None,
            created_at: now,
            updated_at: now,
        };

        let text = render(&contract, &child);
        assert!(text.starts_with("CONTRATO DE MATRÍCULA 2026"));
        assert!(text.contains("Paula Lima, CPF 123.456.789-09"));
        assert!(text.contains("R$ 1.450,00"));
        assert!(text.contains("a partir de 01/02/2026"));
        assert!(!text.contains("SAÚDE"));
    }
}
