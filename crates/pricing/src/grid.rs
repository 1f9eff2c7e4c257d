//! Typed price grid: ten monthly cells for one partner of one product.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use stripmarket_store::document::coerce_price;

/// Number of cells in every grid.
pub const PRICE_SLOTS: usize = 10;

/// 1-based cell index, stored as field `price{n}`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct PriceSlot(usize);

impl PriceSlot {
    /// `None` unless `1 <= n <= PRICE_SLOTS`.
    pub fn new(n: usize) -> Option<Self> {
        (1..=PRICE_SLOTS).contains(&n).then_some(Self(n))
    }

    pub fn number(self) -> usize {
        self.0
    }

    /// Document field name (`price1`..`price10`).
    pub fn field(self) -> String {
        format!("price{}", self.0)
    }

    pub fn all() -> impl Iterator<Item = PriceSlot> {
        (1..=PRICE_SLOTS).map(PriceSlot)
    }

    fn offset(self) -> usize {
        self.0 - 1
    }
}

impl core::fmt::Display for PriceSlot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<usize> for PriceSlot {
    type Error = String;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        PriceSlot::new(value).ok_or_else(|| format!("price slot {value} out of range"))
    }
}

impl From<PriceSlot> for usize {
    fn from(value: PriceSlot) -> Self {
        value.0
    }
}

/// Parse caller-supplied price text: ASCII digits only, fits in `u32`.
pub fn parse_price(raw: &str) -> Option<u32> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Ten price cells. Missing or corrupt stored cells read as 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PriceGrid {
    cells: [u32; PRICE_SLOTS],
}

impl PriceGrid {
    pub fn zeroed() -> Self {
        Self::default()
    }

    pub fn from_cells(cells: [u32; PRICE_SLOTS]) -> Self {
        Self { cells }
    }

    /// Read a partner sub-document (`{price1: .., .., price10: ..}`).
    ///
    /// Never fails: absent cells are 0, and so are cells holding anything but a
    /// non-negative whole number. Unknown fields are ignored.
    pub fn from_document(doc: Option<&Value>) -> Self {
        let mut grid = Self::zeroed();
        for slot in PriceSlot::all() {
            let field = slot.field();
            let Some(raw) = doc.and_then(|d| d.get(&field)) else {
                continue;
            };
            match coerce_price(raw) {
                Some(value) => grid.cells[slot.offset()] = value,
                None => tracing::debug!(field = %field, value = %raw, "corrupt price cell read as 0"),
            }
        }
        grid
    }

    /// Full document form, every cell present.
    pub fn to_document(&self) -> Value {
        let fields: Map<String, Value> = PriceSlot::all()
            .map(|slot| (slot.field(), Value::from(self.get(slot))))
            .collect();
        Value::Object(fields)
    }

    pub fn get(&self, slot: PriceSlot) -> u32 {
        self.cells[slot.offset()]
    }

    pub fn set(&mut self, slot: PriceSlot, value: u32) {
        self.cells[slot.offset()] = value;
    }

    pub fn cells(&self) -> &[u32; PRICE_SLOTS] {
        &self.cells
    }
}
