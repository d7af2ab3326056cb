use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Closed set of visitor personas the site tailors content for.
///
/// Unrecognized input falls back to `Buyer` everywhere a defensive default is
/// needed (content lookup and portal routing use the same default).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Buyer,
    Seller,
    Agent,
    Lender,
    Investor,
}

pub const ALL_ROLES: [Role; 5] =
    [Role::Buyer, Role::Seller, Role::Agent, Role::Lender, Role::Investor];

impl Role {
    /// Normalized value used for durable storage and case-insensitive matching.
    pub fn storage_value(&self) -> &'static str {
        match self {
            Self::Buyer => "buyer",
            Self::Seller => "seller",
            Self::Agent => "agent",
            Self::Lender => "lender",
            Self::Investor => "investor",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Buyer => "Buyer",
            Self::Seller => "Seller",
            Self::Agent => "Real Estate Agent",
            Self::Lender => "Lender",
            Self::Investor => "Investor",
        }
    }

    /// Lenient parse for values arriving from storage or query strings.
    /// Returns the default persona when the value is unrecognized.
    pub fn parse_or_default(value: &str) -> Self {
        value.parse().unwrap_or(Self::Buyer)
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::Buyer
    }
}

impl std::str::FromStr for Role {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "buyer" => Ok(Self::Buyer),
            "seller" => Ok(Self::Seller),
            "agent" | "real estate agent" => Ok(Self::Agent),
            "lender" => Ok(Self::Lender),
            "investor" => Ok(Self::Investor),
            other => Err(DomainError::UnknownRole(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValueProp {
    pub title: &'static str,
    pub description: &'static str,
}

/// Read-only, per-persona display content. Defined at process start, never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RoleContent {
    pub headline: &'static str,
    pub subheadline: &'static str,
    pub primary_cta: &'static str,
    pub destination_url: &'static str,
    pub badge_text: &'static str,
    pub experience_label: &'static str,
    pub value_props: [ValueProp; 3],
}

/// Exhaustive content table. Adding a role without a row here is a compile error.
pub fn content_for(role: Role) -> &'static RoleContent {
    match role {
        Role::Buyer => &BUYER_CONTENT,
        Role::Seller => &SELLER_CONTENT,
        Role::Agent => &AGENT_CONTENT,
        Role::Lender => &LENDER_CONTENT,
        Role::Investor => &INVESTOR_CONTENT,
    }
}

static BUYER_CONTENT: RoleContent = RoleContent {
    headline: "The World's Best Buyer Experience.",
    subheadline: "Built on the fastest data in the industry. Track every milestone of your \
                  purchase with our proprietary closing engine.",
    primary_cta: "Track My Closing",
    destination_url: "https://buyers.worldclasstitle.com",
    badge_text: "Proprietary Closing Engine",
    experience_label: "Buyer Dashboard",
    value_props: [
        ValueProp {
            title: "Proprietary Tech",
            description: "Custom-built infrastructure clears title faster than traditional \
                          agencies.",
        },
        ValueProp {
            title: "Fastest Data",
            description: "Direct integrations with source data for instant updates and \
                          transparency.",
        },
        ValueProp {
            title: "Smart One",
            description: "Total home protection that starts the second you close.",
        },
    ],
};

static SELLER_CONTENT: RoleContent = RoleContent {
    headline: "Radical Transparency for Sellers.",
    subheadline: "Proprietary tech that clears your title ahead of schedule. Real-time net \
                  sheets and proactive lien resolution.",
    primary_cta: "Prepare for Closing",
    destination_url: "https://sellers.worldclasstitle.com",
    badge_text: "Proactive Title Clearance",
    experience_label: "Seller Dashboard",
    value_props: [
        ValueProp {
            title: "Instant Net Clarity",
            description: "Know exactly what you'll walk away with, updated in real-time.",
        },
        ValueProp {
            title: "Proactive Clearance",
            description: "Title issues are identified and resolved before they hit the \
                          schedule.",
        },
        ValueProp {
            title: "Seamless Handover",
            description: "Automated communication with all parties through the closing \
                          platform.",
        },
    ],
};

static AGENT_CONTENT: RoleContent = RoleContent {
    headline: "Your Unfair Advantage in Ohio Real Estate.",
    subheadline: "The industry's most advanced agent access system. See every deal, win more \
                  listings, and close faster.",
    primary_cta: "Access Agent Experience",
    destination_url: "https://buyers.worldclasstitle.com",
    badge_text: "Agent Access System",
    experience_label: "Agent Access Panel",
    value_props: [
        ValueProp {
            title: "Agent Access Panel",
            description: "Real-time visibility into every file with the industry's fastest \
                          data sync.",
        },
        ValueProp {
            title: "Proprietary Marketing",
            description: "Exclusive media packages designed to help win the listing \
                          presentation.",
        },
        ValueProp {
            title: "Clear-to-Close Engine",
            description: "Deals clear up to 40% faster than traditional title.",
        },
    ],
};

static LENDER_CONTENT: RoleContent = RoleContent {
    headline: "Institutional Precision. Unmatched Speed.",
    subheadline: "Powered by the best data sets and proprietary title search technology. \
                  Secure, integrated, and built for high-performance teams.",
    primary_cta: "Submit New Order",
    destination_url: "https://buyers.worldclasstitle.com",
    badge_text: "Built for Lending Teams",
    experience_label: "Lender Portal",
    value_props: [
        ValueProp {
            title: "Data Integrity",
            description: "Bank-grade security and source-verified data for total compliance.",
        },
        ValueProp {
            title: "Real-time API",
            description: "Proprietary systems plug directly into your LOS for frictionless \
                          data transfer.",
        },
        ValueProp {
            title: "Secure Wiring",
            description: "Multivariate authentication for every dollar moved through escrow.",
        },
    ],
};

static INVESTOR_CONTENT: RoleContent = RoleContent {
    headline: "Velocity and Visibility at Scale.",
    subheadline: "Proprietary portfolio dashboard built on the fastest data. High-volume \
                  title processing for the modern asset manager.",
    primary_cta: "Portfolio Dashboard",
    destination_url: "https://sellers.worldclasstitle.com",
    badge_text: "High-Volume Processing",
    experience_label: "Investor Dashboard",
    value_props: [
        ValueProp {
            title: "Batch Processing",
            description: "Move 10 or 100 files with the same level of speed and precision.",
        },
        ValueProp {
            title: "Aggressive Clearance",
            description: "Proprietary search tech built for complex distressed properties.",
        },
        ValueProp {
            title: "Asset Protection",
            description: "Active monitoring of your entire property portfolio.",
        },
    ],
};

#[cfg(test)]
mod tests {
    use super::{content_for, Role, ALL_ROLES};

    #[test]
    fn every_role_has_non_empty_headline_and_known_destination() {
        for role in ALL_ROLES {
            let content = content_for(role);
            assert!(!content.headline.is_empty(), "{role:?} headline must not be empty");
            assert!(
                content.destination_url == "https://buyers.worldclasstitle.com"
                    || content.destination_url == "https://sellers.worldclasstitle.com",
                "{role:?} destination must be one of the two portal URLs"
            );
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("SELLER".parse::<Role>().expect("seller"), Role::Seller);
        assert_eq!("  Lender ".parse::<Role>().expect("lender"), Role::Lender);
        assert_eq!("Real Estate Agent".parse::<Role>().expect("agent alias"), Role::Agent);
    }

    #[test]
    fn unknown_role_falls_back_to_buyer() {
        assert!("wizard".parse::<Role>().is_err());
        assert_eq!(Role::parse_or_default("wizard"), Role::Buyer);
    }

    #[test]
    fn storage_values_are_lower_case() {
        for role in ALL_ROLES {
            let value = role.storage_value();
            assert_eq!(value, value.to_ascii_lowercase());
            assert_eq!(Role::parse_or_default(value), role);
        }
    }
}
