use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Currencies tracked per character.
///
/// Serialized by name so that records stay readable and survive id shifts
/// in the host game's item sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    Gil,
    StormSeals,
    SerpentSeals,
    FlameSeals,
    Mgp,
    AlliedSeals,
    Ventures,
    SackOfNuts,
    CenturioSeals,
    Bicolor,
    Skybuilders,
}

/// A single item reward with quantity and quality flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemResult {
    #[serde(default)]
    pub item: u32,
    #[serde(default)]
    pub count: u16,
    #[serde(default)]
    pub hq: bool,
}

impl ItemResult {
    pub fn new(item: u32, count: u16, hq: bool) -> Self {
        Self { item, count, hq }
    }

    /// True for the empty slot the host reports when no item was rewarded.
    pub fn is_empty(&self) -> bool {
        self.item == 0
    }
}

/// One desynthesis: the consumed source item and everything received back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesynthResult {
    #[serde(default)]
    pub source: u32,
    #[serde(default)]
    pub received: Vec<ItemResult>,
}

/// One completed retainer venture and its rewards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VentureResult {
    #[serde(default)]
    pub venture_id: u32,
    #[serde(default)]
    pub primary: ItemResult,
    #[serde(default)]
    pub additional: ItemResult,
}

/// Total currency gains observed while the tracker was running.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyStorage {
    #[serde(default)]
    pub gained: HashMap<Currency, u64>,
}

/// Desynthesis history plus aggregated reward totals keyed by item id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesynthesisStorage {
    #[serde(default)]
    pub history: BTreeMap<DateTime<Utc>, DesynthResult>,
    #[serde(default)]
    pub total: HashMap<u32, u64>,
}

/// Retainer venture history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VentureStorage {
    #[serde(default)]
    pub history: BTreeMap<DateTime<Utc>, VentureResult>,
    #[serde(default)]
    pub opened_coffers: u64,
}

/// Coffer openings (venture and gacha coffers) and the items pulled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CofferStorage {
    #[serde(default)]
    pub opened: u64,
    #[serde(default)]
    pub obtained: HashMap<u32, u64>,
}

fn default_version() -> u32 {
    CharacterConfig::CURRENT_VERSION
}

/// Everything tracked for one character.
///
/// The persistence engine treats this as an opaque serializable value; only
/// the display layer and the scanner glue interpret its contents. Records are
/// replaced wholesale on load and reconcile, never merged field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub character_name: String,
    #[serde(default)]
    pub world: String,
    #[serde(default)]
    pub currency: CurrencyStorage,
    #[serde(default)]
    pub desynthesis: DesynthesisStorage,
    #[serde(default)]
    pub ventures: VentureStorage,
    #[serde(default)]
    pub coffers: CofferStorage,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CharacterConfig {
    pub const CURRENT_VERSION: u32 = 2;

    /// Fresh record used for new characters and as the fallback when a file
    /// on disk is missing or unreadable.
    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            character_name: String::new(),
            world: String::new(),
            currency: CurrencyStorage::default(),
            desynthesis: DesynthesisStorage::default(),
            ventures: VentureStorage::default(),
            coffers: CofferStorage::default(),
        }
    }

    /// Record a positive currency delta observed by the scanner.
    pub fn record_currency_gain(&mut self, currency: Currency, amount: u64) {
        *self.currency.gained.entry(currency).or_insert(0) += amount;
    }

    /// Record one desynthesis result and fold its rewards into the totals.
    pub fn record_desynthesis(&mut self, source: u32, received: Vec<ItemResult>) {
        for reward in received.iter().filter(|r| !r.is_empty()) {
            *self.desynthesis.total.entry(reward.item).or_insert(0) += u64::from(reward.count);
        }

        self.desynthesis
            .history
            .insert(Utc::now(), DesynthResult { source, received });
    }

    /// Record a completed retainer venture.
    pub fn record_venture(&mut self, venture_id: u32, primary: ItemResult, additional: ItemResult) {
        self.ventures.history.insert(
            Utc::now(),
            VentureResult {
                venture_id,
                primary,
                additional,
            },
        );
    }

    /// Record a coffer opening and the item pulled from it.
    pub fn record_coffer(&mut self, item: u32, count: u16) {
        self.coffers.opened += 1;
        *self.coffers.obtained.entry(item).or_insert(0) += u64::from(count);
    }

    /// True once any tracker has stored at least one observation.
    pub fn has_data(&self) -> bool {
        !self.currency.gained.is_empty()
            || !self.desynthesis.history.is_empty()
            || !self.ventures.history.is_empty()
            || self.coffers.opened > 0
    }
}
