use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// The overlays the shell can present. Each has an independent open flag;
/// opening one never implicitly closes another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Overlay {
    QuoteViewer,
    OrderWizard,
    EarnestMoney,
    FraudMap,
    BrandGuide,
    SellerIdentity,
    DemoGate,
}

pub const ALL_OVERLAYS: [Overlay; 7] = [
    Overlay::QuoteViewer,
    Overlay::OrderWizard,
    Overlay::EarnestMoney,
    Overlay::FraudMap,
    Overlay::BrandGuide,
    Overlay::SellerIdentity,
    Overlay::DemoGate,
];

impl Overlay {
    pub fn name(&self) -> &'static str {
        match self {
            Self::QuoteViewer => "quote_viewer",
            Self::OrderWizard => "order_wizard",
            Self::EarnestMoney => "earnest_money",
            Self::FraudMap => "fraud_map",
            Self::BrandGuide => "brand_guide",
            Self::SellerIdentity => "seller_identity",
            Self::DemoGate => "demo_gate",
        }
    }
}

/// Session-scoped open/close state for the shell's overlays, plus the pending
/// navigation carried by the demo gate. Navigation only happens on explicit
/// confirmation; closing the gate without confirming discards the destination.
#[derive(Clone, Debug, Default)]
pub struct ShellState {
    open: BTreeSet<Overlay>,
    pending_navigation: Option<String>,
}

impl ShellState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, overlay: Overlay) {
        self.open.insert(overlay);
    }

    pub fn close(&mut self, overlay: Overlay) {
        self.open.remove(&overlay);
        if overlay == Overlay::DemoGate {
            self.pending_navigation = None;
        }
    }

    pub fn is_open(&self, overlay: Overlay) -> bool {
        self.open.contains(&overlay)
    }

    pub fn open_overlays(&self) -> Vec<Overlay> {
        self.open.iter().copied().collect()
    }

    /// Open the demo gate with a destination to visit if the visitor confirms.
    pub fn request_navigation(&mut self, destination: impl Into<String>) {
        self.pending_navigation = Some(destination.into());
        self.open.insert(Overlay::DemoGate);
    }

    pub fn pending_navigation(&self) -> Option<&str> {
        self.pending_navigation.as_deref()
    }

    /// Confirm the gate: returns the stored destination and closes the gate.
    pub fn confirm_navigation(&mut self) -> Option<String> {
        let destination = self.pending_navigation.take();
        self.open.remove(&Overlay::DemoGate);
        destination
    }

    /// Dismiss the gate without navigating.
    pub fn dismiss_navigation(&mut self) {
        self.close(Overlay::DemoGate);
    }
}

#[cfg(test)]
mod tests {
    use super::{Overlay, ShellState, ALL_OVERLAYS};

    #[test]
    fn overlays_open_and_close_independently() {
        let mut shell = ShellState::new();
        shell.open(Overlay::OrderWizard);
        shell.open(Overlay::FraudMap);

        assert!(shell.is_open(Overlay::OrderWizard));
        assert!(shell.is_open(Overlay::FraudMap));
        assert!(!shell.is_open(Overlay::BrandGuide));

        shell.close(Overlay::OrderWizard);
        assert!(!shell.is_open(Overlay::OrderWizard));
        assert!(shell.is_open(Overlay::FraudMap), "closing one overlay leaves others open");
    }

    #[test]
    fn confirming_the_demo_gate_yields_the_pending_destination() {
        let mut shell = ShellState::new();
        shell.request_navigation("https://buyers.example.test");
        assert!(shell.is_open(Overlay::DemoGate));

        let destination = shell.confirm_navigation();
        assert_eq!(destination.as_deref(), Some("https://buyers.example.test"));
        assert!(!shell.is_open(Overlay::DemoGate));
        assert_eq!(shell.pending_navigation(), None);
    }

    #[test]
    fn dismissing_the_demo_gate_discards_the_pending_destination() {
        let mut shell = ShellState::new();
        shell.request_navigation("https://sellers.example.test");

        shell.dismiss_navigation();
        assert!(!shell.is_open(Overlay::DemoGate));
        assert_eq!(shell.confirm_navigation(), None, "nothing left to confirm after dismissal");
    }

    #[test]
    fn overlay_names_are_unique() {
        let mut seen = std::collections::BTreeSet::new();
        for overlay in ALL_OVERLAYS {
            assert!(seen.insert(overlay.name()), "duplicate overlay name {}", overlay.name());
        }
    }
}
