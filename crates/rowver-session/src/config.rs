//! RON configuration for seeds and demonstrated scenarios
//!
//! A scenario is fully described by the row it starts from, the fields the
//! local caller changes and the fields an outside writer changes in between.
//! The three built-in scenarios reproduce the classic contrast:
//!
//! | scenario     | kind      | local                 | external     |
//! |--------------|-----------|-----------------------|--------------|
//! | `no-overlap` | bare      | name, price           | stock = 75   |
//! | `overlap`    | bare      | name, price, stock    | stock = 75   |
//! | `versioned`  | versioned | name, price           | stock = 50   |
//!
//! ```
//! use rowver_session::DemoConfig;
//!
//! let config = DemoConfig::from_ron_str(r#"(
//!     scenarios: [(
//!         name: "stock-race",
//!         kind: Versioned,
//!         local: [SetStock(1)],
//!         external: [SetStock(2)],
//!     )],
//!     contenders: Some(4),
//! )"#).unwrap();
//!
//! assert_eq!(config.scenarios[0].seed.stock, 100);
//! assert_eq!(config.contenders(), 4);
//! ```

use crate::error::{Error, Result};
use crate::race::{default_contenders, MAX_CONTENDERS, MIN_CONTENDERS};
use rowver_core::{ChangeSet, Fields, Price, RecordId, RecordKind};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// The single row a reset leaves behind
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SeedConfig {
    #[serde(default = "default_seed_id")]
    pub id: u64,
    #[serde(default = "default_seed_name")]
    pub name: String,
    #[serde(default = "default_seed_stock")]
    pub stock: i64,
    #[serde(default = "default_seed_price")]
    pub price: Price,
}

fn default_seed_id() -> u64 {
    1
}

fn default_seed_name() -> String {
    "Widget".to_string()
}

fn default_seed_stock() -> i64 {
    100
}

fn default_seed_price() -> Price {
    Price::from_cents(1000)
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            id: default_seed_id(),
            name: default_seed_name(),
            stock: default_seed_stock(),
            price: default_seed_price(),
        }
    }
}

impl SeedConfig {
    pub fn record_id(&self) -> RecordId {
        RecordId::new(self.id)
    }

    pub fn fields(&self) -> Fields {
        Fields::new(self.name.clone(), self.stock, self.price)
    }
}

/// One demonstrated workflow
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ScenarioConfig {
    pub name: String,
    pub kind: RecordKind,
    #[serde(default)]
    pub seed: SeedConfig,
    /// Fields the local caller reassigns on its private copy
    pub local: ChangeSet,
    /// Fields another writer stores directly while the local copy is open
    pub external: ChangeSet,
}

impl ScenarioConfig {
    /// Bare record, local and external writers touch different fields
    pub fn no_overlap() -> Self {
        Self {
            name: "no-overlap".to_string(),
            kind: RecordKind::Bare,
            seed: SeedConfig::default(),
            local: ChangeSet::new()
                .set_name("Widget Pro")
                .set_price(Price::from_cents(1250)),
            external: ChangeSet::new().set_stock(75),
        }
    }

    /// Bare record, both writers touch stock
    pub fn overlap() -> Self {
        Self {
            name: "overlap".to_string(),
            kind: RecordKind::Bare,
            seed: SeedConfig::default(),
            local: ChangeSet::new()
                .set_name("Widget Pro")
                .set_price(Price::from_cents(1250))
                .set_stock(1000),
            external: ChangeSet::new().set_stock(75),
        }
    }

    /// Versioned record, any external write makes the local save conflict
    pub fn versioned() -> Self {
        Self {
            name: "versioned".to_string(),
            kind: RecordKind::Versioned,
            seed: SeedConfig::default(),
            local: ChangeSet::new()
                .set_name("Widget Pro")
                .set_price(Price::from_cents(1250)),
            external: ChangeSet::new().set_stock(50),
        }
    }
}

/// Everything the demo binary runs
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DemoConfig {
    pub scenarios: Vec<ScenarioConfig>,
    /// Threads racing one token; defaults to the CPU count
    #[serde(default)]
    pub contenders: Option<usize>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            scenarios: vec![
                ScenarioConfig::no_overlap(),
                ScenarioConfig::overlap(),
                ScenarioConfig::versioned(),
            ],
            contenders: None,
        }
    }
}

impl DemoConfig {
    /// Parse a RON document
    pub fn from_ron_str(s: &str) -> Result<Self> {
        ron::from_str(s).map_err(|e| Error::Config(e.to_string()))
    }

    /// Read and parse a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_ron_str(&text)
    }

    /// Contender count for the race, clamped to a sensible range
    pub fn contenders(&self) -> usize {
        self.contenders
            .map(|n| n.clamp(MIN_CONTENDERS, MAX_CONTENDERS))
            .unwrap_or_else(default_contenders)
    }
}
