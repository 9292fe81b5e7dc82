// src/memory.rs ---------------------------------------------------------------
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadStatus {
    #[default]
    #[serde(alias = "NOVO")]
    New,
    #[serde(alias = "PROSPECTADO")]
    Prospected,
    /// Declared upstream but never produced; admission maps it to `New`.
    #[serde(alias = "PENDENTE")]
    Pending,
}

impl LeadStatus {
    /// `New ⇄ Prospected`. `Pending` has no transition and stays put.
    pub fn toggled(self) -> Self {
        match self {
            LeadStatus::New        => LeadStatus::Prospected,
            LeadStatus::Prospected => LeadStatus::New,
            LeadStatus::Pending    => LeadStatus::Pending,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Lead {
    pub id:    Uuid,
    pub name:  String,
    pub email: String,
    pub phone: String,
    pub niche: String,

    pub status: LeadStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role:    Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Lead {
    /// Click-to-chat link for the lead's phone. Numbers without a country
    /// code (11 digits or fewer) are assumed Brazilian.
    pub fn whatsapp_url(&self) -> String {
        let digits: String = self.phone.chars().filter(char::is_ascii_digit).collect();
        let ddi = if digits.len() <= 11 { "55" } else { "" };

        format!(
            "https://wa.me/{ddi}{digits}?text=Ol%C3%A1%20{},%20falo%20do%20LeadGen.",
            percent_encode(&self.name)
        )
    }
}

// encodeURIComponent semantics: unreserved ASCII passes, everything else is %XX per UTF-8 byte
fn percent_encode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9'
            | b'-' | b'_' | b'.' | b'!' | b'~' | b'*' | b'\'' | b'(' | b')' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// A lead as the generator hands it over: contact fields only, no identity.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct LeadDraft {
    #[serde(alias = "nome")]
    pub name:  String,
    pub email: String,
    #[serde(alias = "telefone")]
    pub phone: String,
    #[serde(default, alias = "nicho")]
    pub niche: Option<String>,
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: Option<LeadStatus>,
    #[serde(default, alias = "empresa")]
    pub company: Option<String>,
    #[serde(default, alias = "cargo")]
    pub role:    Option<String>,
}

// an unrecognised status is treated as absent rather than failing the record
fn lenient_status<'de, D: Deserializer<'de>>(d: D) -> Result<Option<LeadStatus>, D::Error> {
    let raw = Option::<serde_json::Value>::deserialize(d)?;
    Ok(raw.and_then(|v| serde_json::from_value(v).ok()))
}

impl LeadDraft {
    /// Admit the draft into the store's domain: fresh id and timestamp,
    /// niche falls back to the one requested, status is always a live value.
    pub fn into_lead(self, requested_niche: &str, now: DateTime<Utc>) -> Lead {
        let niche = self
            .niche
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| requested_niche.to_string());
        let status = match self.status {
            Some(LeadStatus::Prospected) => LeadStatus::Prospected,
            _                            => LeadStatus::New,
        };

        Lead {
            id: Uuid::new_v4(),
            name: self.name,
            email: self.email,
            phone: self.phone,
            niche,
            status,
            company: self.company.filter(|c| !c.trim().is_empty()),
            role: self.role.filter(|r| !r.trim().is_empty()),
            created_at: now,
        }
    }
}

// -----------------------------------------------------------------------------
// store

/// Ordered, newest-first collection of leads for one session.
#[derive(Debug, Default, Clone)]
pub struct LeadStore {
    leads: Vec<Lead>,
}

impl LeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend a batch, keeping the batch's own order at the front.
    pub fn add_batch(&mut self, batch: Vec<Lead>) {
        self.leads.splice(0..0, batch);
    }

    /// Flip `New ⇄ Prospected` for `id`. Unknown ids are ignored.
    pub fn toggle_status(&mut self, id: Uuid) -> Option<LeadStatus> {
        let lead = self.leads.iter_mut().find(|l| l.id == id)?;
        lead.status = lead.status.toggled();
        Some(lead.status)
    }

    pub fn get(&self, id: Uuid) -> Option<&Lead> {
        self.leads.iter().find(|l| l.id == id)
    }

    pub fn leads(&self) -> &[Lead] {
        &self.leads
    }

    pub fn len(&self) -> usize {
        self.leads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }
}
