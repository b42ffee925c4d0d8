//! Attribute names used by the `out` ledger and the rules that group them.

/// Name of the synthetic region holding the rollup of all other regions.
pub const GLOBAL_REGION: &str = "global";

/// Consumption by sector.
pub const CONSUMPTION_ATTRS: [&str; 8] = [
    "consumptionAgricultureMT",
    "consumptionConstructionMT",
    "consumptionElectronicMT",
    "consumptionHouseholdLeisureSportsMT",
    "consumptionPackagingMT",
    "consumptionTransporationMT",
    "consumptionTextileMT",
    "consumptionOtherMT",
];

/// End-of-life fates, including waste trade.
pub const EOL_ATTRS: [&str; 6] = [
    "eolLandfillMT",
    "eolIncinerationMT",
    "eolRecyclingMT",
    "eolMismanagedMT",
    "netWasteExportMT",
    "netWasteImportMT",
];

pub const PRODUCTION_ATTRS: [&str; 4] = [
    "netImportsMT",
    "netExportsMT",
    "primaryProductionMT",
    "secondaryProductionMT",
];

/// Net-trade attributes forced to zero in the global rollup since trade
/// between regions cancels out.
pub const NET_TRADE_DENYLIST: [&str; 2] = ["netImportsMT", "netWasteImportMT"];

/// Input holding the shared lifetime of every end-of-life attribute.
pub const RECYCLING_DELAY_INPUT: &str = "recyclingDelay";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeFamily {
    Consumption,
    EndOfLife,
    Production,
}

impl AttributeFamily {
    pub fn of(attribute: &str) -> Option<Self> {
        if CONSUMPTION_ATTRS.contains(&attribute) {
            Some(AttributeFamily::Consumption)
        } else if EOL_ATTRS.contains(&attribute) {
            Some(AttributeFamily::EndOfLife)
        } else if PRODUCTION_ATTRS.contains(&attribute) {
            Some(AttributeFamily::Production)
        } else {
            None
        }
    }

    pub fn attributes(self) -> &'static [&'static str] {
        match self {
            AttributeFamily::Consumption => &CONSUMPTION_ATTRS,
            AttributeFamily::EndOfLife => &EOL_ATTRS,
            AttributeFamily::Production => &PRODUCTION_ATTRS,
        }
    }
}

pub fn is_rollup_excluded(attribute: &str) -> bool {
    NET_TRADE_DENYLIST.contains(&attribute)
}

/// Input name holding the product lifetime of a consumption attribute:
/// `consumptionPackagingMT` reads `consumptionPackagingLifecycle`.
pub fn lifetime_input(attribute: &str) -> String {
    attribute.replace("MT", "Lifecycle")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_families_are_disjoint() {
        for attr in CONSUMPTION_ATTRS {
            assert_eq!(AttributeFamily::of(attr), Some(AttributeFamily::Consumption));
        }
        for attr in EOL_ATTRS {
            assert_eq!(AttributeFamily::of(attr), Some(AttributeFamily::EndOfLife));
        }
        for attr in PRODUCTION_ATTRS {
            assert_eq!(AttributeFamily::of(attr), Some(AttributeFamily::Production));
        }
        assert_eq!(AttributeFamily::of("populationMillions"), None);
    }

    #[test]
    fn test_transportation_matches_data_column() {
        // Baseline files spell this column without the second "t".
        assert_eq!(
            AttributeFamily::of("consumptionTransporationMT"),
            Some(AttributeFamily::Consumption)
        );
        assert_eq!(AttributeFamily::of("consumptionTransportationMT"), None);
        assert_eq!(
            lifetime_input("consumptionTransporationMT"),
            "consumptionTransporationLifecycle"
        );
    }

    #[test]
    fn test_lifetime_input() {
        assert_eq!(
            lifetime_input("consumptionTextileMT"),
            "consumptionTextileLifecycle"
        );
    }

    #[test]
    fn test_denylist() {
        assert!(is_rollup_excluded("netImportsMT"));
        assert!(is_rollup_excluded("netWasteImportMT"));
        assert!(!is_rollup_excluded("netExportsMT"));
    }
}
