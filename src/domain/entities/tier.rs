use serde::{Deserialize, Serialize};

/// One of the six nested partition levels of the community hierarchy, from
/// the largest (Gigacluster) down to the smallest (Constellation). The core
/// only ever handles `Tier` values; mapping a tier to a storage column is the
/// store adapter's business.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Gigacluster,
    Supercluster,
    Cluster,
    Galaxy,
    Nebula,
    Constellation,
}

impl Tier {
    pub const ALL: [Tier; 6] = [
        Tier::Gigacluster,
        Tier::Supercluster,
        Tier::Cluster,
        Tier::Galaxy,
        Tier::Nebula,
        Tier::Constellation,
    ];

    /// Single-character code used on the wire and in community codes.
    pub fn prefix(&self) -> char {
        match self {
            Tier::Gigacluster => 'f',
            Tier::Supercluster => 's',
            Tier::Cluster => 'c',
            Tier::Galaxy => 'g',
            Tier::Nebula => 'e',
            Tier::Constellation => 'o',
        }
    }

    pub fn from_prefix(prefix: char) -> Option<Tier> {
        match prefix {
            'f' => Some(Tier::Gigacluster),
            's' => Some(Tier::Supercluster),
            'c' => Some(Tier::Cluster),
            'g' => Some(Tier::Galaxy),
            'e' => Some(Tier::Nebula),
            'o' => Some(Tier::Constellation),
            _ => None,
        }
    }
}
