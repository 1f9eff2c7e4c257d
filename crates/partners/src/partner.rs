use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use stripmarket_core::{DomainError, Entity, PartnerId};
use stripmarket_store::document::string_field;
use stripmarket_store::{DocumentPath, StoreError, StoreLayout};

/// Display name of an entry stored without one.
pub const UNNAMED: &str = "Unnamed";

/// Partner kind: buyer or wholesaler. Both share one document shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartnerKind {
    #[default]
    Buyer,
    Wholesaler,
}

impl PartnerKind {
    /// Registry root of this kind.
    pub fn root(self, layout: &StoreLayout) -> Result<DocumentPath, StoreError> {
        match self {
            PartnerKind::Buyer => layout.buyers_path(),
            PartnerKind::Wholesaler => layout.wholesalers_path(),
        }
    }
}

impl core::fmt::Display for PartnerKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PartnerKind::Buyer => f.write_str("buyer"),
            PartnerKind::Wholesaler => f.write_str("wholesaler"),
        }
    }
}

/// Postal address of a partner.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Address {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suite: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
}

impl Address {
    /// Trim every field and check the formats (`state` two upper-case letters,
    /// `zip` five digits).
    pub fn normalized(&self) -> Result<Address, DomainError> {
        let address = non_blank("address", &self.address)?;
        let city = non_blank("city", &self.city)?;
        let state = self.state.trim();
        check_state(state)?;
        let zip = self.zip.trim();
        check_zip(zip)?;
        let suite = self
            .suite
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Address {
            address,
            suite,
            city,
            state: state.to_string(),
            zip: zip.to_string(),
        })
    }

    /// Permissive read; `None` unless at least one address field is stored.
    fn from_document(doc: Option<&Value>) -> Option<Address> {
        let address = string_field(doc, "address");
        let city = string_field(doc, "city");
        let state = string_field(doc, "state");
        let zip = string_field(doc, "zip");
        if address.is_none() && city.is_none() && state.is_none() && zip.is_none() {
            return None;
        }

        Some(Address {
            address: address.unwrap_or_default(),
            suite: string_field(doc, "suite"),
            city: city.unwrap_or_default(),
            state: state.unwrap_or_default(),
            zip: zip.unwrap_or_default(),
        })
    }
}

/// A registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partner {
    id: PartnerId,
    kind: PartnerKind,
    name: String,
    address: Option<Address>,
}

impl Partner {
    pub fn from_document(id: PartnerId, kind: PartnerKind, doc: Option<&Value>) -> Self {
        let name = string_field(doc, "name")
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| UNNAMED.to_string());

        Self {
            id,
            kind,
            name,
            address: Address::from_document(doc),
        }
    }

    pub fn id_typed(&self) -> &PartnerId {
        &self.id
    }

    pub fn kind(&self) -> PartnerKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> Option<&Address> {
        self.address.as_ref()
    }
}

impl Entity for Partner {
    type Id = PartnerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Command: register a partner.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewPartner {
    pub name: String,
    pub address: Option<Address>,
}

impl NewPartner {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: None,
        }
    }

    /// Validated document body (`{name, address?, suite?, city?, state?, zip?}`).
    pub fn to_document(&self) -> Result<Value, DomainError> {
        #[derive(Serialize)]
        struct PartnerDocument<'a> {
            name: &'a str,
            #[serde(flatten)]
            address: Option<&'a Address>,
        }

        let name = non_blank("partner name", &self.name)?;
        let address = self.address.as_ref().map(Address::normalized).transpose()?;

        serde_json::to_value(PartnerDocument {
            name: &name,
            address: address.as_ref(),
        })
        .map_err(|e| DomainError::validation(format!("partner document: {e}")))
    }
}

/// Command: change some details of a partner.
///
/// Only supplied, non-blank fields are written; the rest keep their stored value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PartnerUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
    pub suite: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}

impl PartnerUpdate {
    pub fn is_empty(&self) -> bool {
        self.supplied().next().is_none()
    }

    /// Validated child writes for the partner document.
    pub fn fields(&self) -> Result<Map<String, Value>, DomainError> {
        let mut fields = Map::new();
        for (field, value) in self.supplied() {
            match field {
                "state" => check_state(value)?,
                "zip" => check_zip(value)?,
                _ => {}
            }
            fields.insert(field.to_string(), Value::String(value.to_string()));
        }
        Ok(fields)
    }

    fn supplied(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("name", &self.name),
            ("address", &self.address),
            ("suite", &self.suite),
            ("city", &self.city),
            ("state", &self.state),
            ("zip", &self.zip),
        ]
        .into_iter()
        .filter_map(|(field, value)| {
            let value = value.as_deref()?.trim();
            (!value.is_empty()).then_some((field, value))
        })
    }
}

fn non_blank(what: &str, raw: &str) -> Result<String, DomainError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(DomainError::validation(format!("{what} cannot be blank")));
    }
    Ok(value.to_string())
}

fn check_state(state: &str) -> Result<(), DomainError> {
    if state.len() == 2 && state.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(DomainError::validation(format!(
            "state '{state}' must be two upper-case letters"
        )))
    }
}

fn check_zip(zip: &str) -> Result<(), DomainError> {
    if zip.len() == 5 && zip.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(DomainError::validation(format!("zip '{zip}' must be five digits")))
    }
}
