//! Tumor subsite grouping
//!
//! Primary tumor locations are recorded as ICD-10 topography codes. For
//! filtering and statistics the codes are grouped into the anatomical
//! subsites of the head and neck listed here. Each code belongs to at
//! most one group.

use serde::{Deserialize, Serialize};

/// Anatomical subsite group of the primary tumor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubsiteGroup {
    /// Base of tongue
    Base,
    /// Tonsil
    Tonsil,
    /// Other oropharynx
    RestOro,
    /// Hypopharynx
    RestHypo,
    /// Glottic larynx
    Glottis,
    /// Other larynx
    RestLarynx,
    /// Oral tongue
    Tongue,
    /// Gums and cheek
    GumCheek,
    /// Floor of mouth
    MouthFloor,
    /// Palate
    Palate,
    /// Salivary glands
    Glands,
}

impl SubsiteGroup {
    /// Number of groups.
    pub const COUNT: usize = 11;

    /// All groups in reporting order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Base,
        Self::Tonsil,
        Self::RestOro,
        Self::RestHypo,
        Self::Glottis,
        Self::RestLarynx,
        Self::Tongue,
        Self::GumCheek,
        Self::MouthFloor,
        Self::Palate,
        Self::Glands,
    ];

    /// Position in [`Self::ALL`], used to index per-group count arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Base => 0,
            Self::Tonsil => 1,
            Self::RestOro => 2,
            Self::RestHypo => 3,
            Self::Glottis => 4,
            Self::RestLarynx => 5,
            Self::Tongue => 6,
            Self::GumCheek => 7,
            Self::MouthFloor => 8,
            Self::Palate => 9,
            Self::Glands => 10,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Tonsil => "tonsil",
            Self::RestOro => "rest_oro",
            Self::RestHypo => "rest_hypo",
            Self::Glottis => "glottis",
            Self::RestLarynx => "rest_larynx",
            Self::Tongue => "tongue",
            Self::GumCheek => "gum_cheek",
            Self::MouthFloor => "mouth_floor",
            Self::Palate => "palate",
            Self::Glands => "glands",
        }
    }

    /// The ICD-10 topography codes belonging to this group.
    #[must_use]
    pub const fn icd_codes(self) -> &'static [&'static str] {
        match self {
            Self::Base => &["C01", "C01.9"],
            Self::Tonsil => &["C09.0", "C09.1", "C09.8", "C09.9"],
            Self::RestOro => &["C10.0", "C10.1", "C10.2", "C10.3", "C10.4", "C10.8", "C10.9"],
            Self::RestHypo => &["C12", "C12.9", "C13.0", "C13.1", "C13.2", "C13.8", "C13.9"],
            Self::Glottis => &["C32.0"],
            Self::RestLarynx => &["C32.1", "C32.2", "C32.3", "C32.8", "C32.9"],
            Self::Tongue => &["C02.0", "C02.1", "C02.2", "C02.3", "C02.4", "C02.8", "C02.9"],
            Self::GumCheek => &[
                "C03.0", "C03.1", "C03.9", "C06.0", "C06.1", "C06.2", "C06.8", "C06.9",
            ],
            Self::MouthFloor => &["C04.0", "C04.1", "C04.8", "C04.9"],
            Self::Palate => &["C05.0", "C05.1", "C05.2", "C05.8", "C05.9"],
            Self::Glands => &["C08.0", "C08.1", "C08.9"],
        }
    }

    /// Find the group an ICD-10 code belongs to.
    #[must_use]
    pub fn from_icd(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|group| group.icd_codes().contains(&code))
    }

    /// Is the code listed in any group's table?
    #[must_use]
    pub fn is_known_code(code: &str) -> bool {
        Self::from_icd(code).is_some()
    }
}

impl std::fmt::Display for SubsiteGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_code_maps_to_one_group() {
        for group in SubsiteGroup::ALL {
            for code in group.icd_codes() {
                assert_eq!(SubsiteGroup::from_icd(code), Some(group), "code {code}");
            }
        }
    }

    #[test]
    fn test_index_matches_reporting_order() {
        for (position, group) in SubsiteGroup::ALL.into_iter().enumerate() {
            assert_eq!(group.index(), position);
        }
    }

    #[test]
    fn test_unlisted_code_has_no_group() {
        assert_eq!(SubsiteGroup::from_icd("C77.0"), None);
        assert!(!SubsiteGroup::is_known_code("C77.0"));
        assert!(SubsiteGroup::is_known_code("C01.9"));
    }

    #[test]
    fn test_group_names_are_stable() {
        assert_eq!(SubsiteGroup::Base.as_str(), "base");
        assert_eq!(SubsiteGroup::MouthFloor.as_str(), "mouth_floor");
        let json = serde_json::to_string(&SubsiteGroup::RestOro).unwrap();
        assert_eq!(json, r#""rest_oro""#);
    }
}
