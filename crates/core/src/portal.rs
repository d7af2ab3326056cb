use crate::config::PortalsConfig;
use crate::domain::role::Role;

/// Which of the two client portals a visitor belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortalSide {
    Buyer,
    Seller,
}

impl PortalSide {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Buyer | Role::Agent | Role::Lender => Self::Buyer,
            Role::Seller | Role::Investor => Self::Seller,
        }
    }
}

/// Map a visitor role to the configured portal URL. Buyers, agents, and
/// lenders land on the buyer-side portal; sellers and investors on the
/// seller-side one.
pub fn resolve_destination(role: Role, portals: &PortalsConfig) -> String {
    match PortalSide::for_role(role) {
        PortalSide::Buyer => portals.buyer_url.clone(),
        PortalSide::Seller => portals.seller_url.clone(),
    }
}

/// Resolve from a raw stored value. Unknown or missing values fall back to the
/// buyer role, so a fresh visitor still gets a working destination.
pub fn resolve_destination_for(raw_role: Option<&str>, portals: &PortalsConfig) -> String {
    let role = raw_role.map(Role::parse_or_default).unwrap_or_default();
    resolve_destination(role, portals)
}
