use serde::{Deserialize, Serialize};

use crate::domain::staging::FileList;
use crate::errors::DomainError;

/// Closed set of submitter roles offered on the wizard's first step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitterRole {
    ListingAgent,
    Lender,
    BuyerSideAgent,
    Other,
}

impl SubmitterRole {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ListingAgent => "Listing Agent",
            Self::Lender => "Lender",
            Self::BuyerSideAgent => "Buyer-Side Agent",
            Self::Other => "Other",
        }
    }
}

impl std::str::FromStr for SubmitterRole {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "listing agent" | "listing_agent" => Ok(Self::ListingAgent),
            "lender" => Ok(Self::Lender),
            "buyer-side agent" | "buyer_side_agent" => Ok(Self::BuyerSideAgent),
            "other" => Ok(Self::Other),
            other => Err(DomainError::UnknownRole(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    #[default]
    Purchase,
    Refinance,
}

impl TransactionType {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Purchase => "Purchase",
            Self::Refinance => "Refinance",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub county: String,
}

/// Structured address breakdown returned by the analysis service. Fields the
/// service omits stay `None` and must not disturb manually entered values.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressBreakdown {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub county: Option<String>,
}

impl PropertyAddress {
    /// Overwrite only the fields the breakdown actually supplied.
    pub fn apply_breakdown(&mut self, breakdown: &AddressBreakdown) {
        if let Some(street) = &breakdown.street {
            self.street = street.clone();
        }
        if let Some(city) = &breakdown.city {
            self.city = city.clone();
        }
        if let Some(state) = &breakdown.state {
            self.state = state.clone();
        }
        if let Some(zip) = &breakdown.zip {
            self.zip = zip.clone();
        }
        if let Some(county) = &breakdown.county {
            self.county = county.clone();
        }
    }
}

/// Single mutable record spanning all three wizard steps. Created when the
/// wizard opens, mutated field-by-field, discarded on close or submit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntakeForm {
    pub submitter_role: Option<SubmitterRole>,
    pub submitter_name: String,
    pub submitter_email: String,
    pub co_participant_name: String,
    pub co_participant_email: String,
    pub address: PropertyAddress,
    pub transaction_type: TransactionType,
    pub price: String,
    pub buyer_names: Vec<String>,
    pub seller_names: Vec<String>,
    pub notes: String,
    pub attachments: FileList,
}

impl IntakeForm {
    /// Fields still required before the wizard may advance past step one.
    pub fn missing_identity_fields(&self) -> Vec<String> {
        if self.submitter_role.is_none() {
            vec!["submitter_role".to_string()]
        } else {
            Vec::new()
        }
    }

    /// Fields still required before final submission. Price is required only
    /// for purchase transactions.
    pub fn missing_submission_fields(&self) -> Vec<String> {
        let mut missing = self.missing_identity_fields();

        if !self.seller_names.iter().any(|name| !name.trim().is_empty()) {
            missing.push("seller_names".to_string());
        }
        if !self.buyer_names.iter().any(|name| !name.trim().is_empty()) {
            missing.push("buyer_names".to_string());
        }
        if self.transaction_type == TransactionType::Purchase && self.price.trim().is_empty() {
            missing.push("price".to_string());
        }

        missing
    }

    /// Plain-text summary of every collected field plus attachment names.
    /// File contents are never included; the destination is a pre-filled mail
    /// draft, so attachments must be added manually by the visitor.
    pub fn summary_text(&self) -> String {
        let mut lines = vec!["NEW TITLE ORDER REQUEST".to_string(), String::new()];

        lines.push("-- Submitter --".to_string());
        lines.push(format!(
            "Role: {}",
            self.submitter_role.map(|role| role.display_name()).unwrap_or("(not selected)")
        ));
        lines.push(format!("Name: {}", or_blank(&self.submitter_name)));
        lines.push(format!("Email: {}", or_blank(&self.submitter_email)));
        if !self.co_participant_name.trim().is_empty()
            || !self.co_participant_email.trim().is_empty()
        {
            lines.push(format!(
                "Co-participant: {} <{}>",
                or_blank(&self.co_participant_name),
                or_blank(&self.co_participant_email)
            ));
        }

        lines.push(String::new());
        lines.push("-- Property --".to_string());
        lines.push(format!("Street: {}", or_blank(&self.address.street)));
        lines.push(format!("City: {}", or_blank(&self.address.city)));
        lines.push(format!("State: {}", or_blank(&self.address.state)));
        lines.push(format!("Zip: {}", or_blank(&self.address.zip)));
        lines.push(format!("County: {}", or_blank(&self.address.county)));

        lines.push(String::new());
        lines.push("-- Transaction --".to_string());
        lines.push(format!("Type: {}", self.transaction_type.display_name()));
        lines.push(format!("Price: {}", or_blank(&self.price)));
        lines.push(format!("Buyer(s): {}", join_or_blank(&self.buyer_names)));
        lines.push(format!("Seller(s): {}", join_or_blank(&self.seller_names)));
        if !self.notes.trim().is_empty() {
            lines.push(format!("Notes: {}", self.notes.trim()));
        }

        lines.push(String::new());
        if self.attachments.is_empty() {
            lines.push("Documents: none attached".to_string());
        } else {
            lines.push("Documents to attach manually:".to_string());
            for name in self.attachments.names() {
                lines.push(format!("  - {name}"));
            }
        }

        lines.join("\n")
    }
}

fn or_blank(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        "(blank)"
    } else {
        trimmed
    }
}

fn join_or_blank(values: &[String]) -> String {
    let joined: Vec<&str> =
        values.iter().map(|value| value.trim()).filter(|value| !value.is_empty()).collect();
    if joined.is_empty() {
        "(blank)".to_string()
    } else {
        joined.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::staging::StagedFile;

    use super::{AddressBreakdown, IntakeForm, SubmitterRole, TransactionType};

    fn minimal_form() -> IntakeForm {
        IntakeForm {
            submitter_role: Some(SubmitterRole::ListingAgent),
            buyer_names: vec!["Ben Buyer".to_string()],
            seller_names: vec!["Sal Seller".to_string()],
            price: "250000".to_string(),
            ..IntakeForm::default()
        }
    }

    #[test]
    fn purchase_with_empty_price_is_incomplete() {
        let mut form = minimal_form();
        form.price.clear();
        assert_eq!(form.missing_submission_fields(), vec!["price".to_string()]);
    }

    #[test]
    fn refinance_does_not_require_price() {
        let mut form = minimal_form();
        form.transaction_type = TransactionType::Refinance;
        form.price.clear();
        assert!(form.missing_submission_fields().is_empty());
    }

    #[test]
    fn submission_requires_buyer_and_seller_names() {
        let mut form = minimal_form();
        form.buyer_names = vec!["   ".to_string()];
        form.seller_names.clear();
        let missing = form.missing_submission_fields();
        assert!(missing.contains(&"seller_names".to_string()));
        assert!(missing.contains(&"buyer_names".to_string()));
    }

    #[test]
    fn breakdown_overwrites_only_supplied_fields() {
        let mut form = minimal_form();
        form.address.state = "OH".to_string();
        form.address.zip = "43081".to_string();

        form.address.apply_breakdown(&AddressBreakdown {
            street: Some("123 Main St".to_string()),
            city: Some("Columbus".to_string()),
            ..AddressBreakdown::default()
        });

        assert_eq!(form.address.street, "123 Main St");
        assert_eq!(form.address.city, "Columbus");
        assert_eq!(form.address.state, "OH");
        assert_eq!(form.address.zip, "43081");
        assert_eq!(form.address.county, "");
    }

    #[test]
    fn summary_lists_attachment_names_without_contents() {
        let mut form = minimal_form();
        form.attachments.add_files([StagedFile::new(
            "contract.pdf",
            "application/pdf",
            b"secret bytes".to_vec(),
        )]);

        let summary = form.summary_text();
        assert!(summary.contains("contract.pdf"));
        assert!(!summary.contains("secret bytes"));
        assert!(summary.contains("Buyer(s): Ben Buyer"));
        assert!(summary.contains("Type: Purchase"));
    }
}
