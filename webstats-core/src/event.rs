// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Decoded raw event records
//!
//! Field names follow the event-log column names so JSON-lines exports of the
//! log deserialize directly.

use crate::dimension::non_blank;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of tracked event (`en` column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "e_l")]
    Launch,
    #[serde(rename = "e_pv")]
    PageView,
    #[serde(rename = "e_crt")]
    ChargeRequest,
    #[serde(rename = "e_cs")]
    ChargeSuccess,
    #[serde(rename = "e_cr")]
    ChargeRefund,
    #[serde(rename = "e_e")]
    Event,
}

impl EventKind {
    pub fn alias(&self) -> &'static str {
        match self {
            EventKind::Launch => "e_l",
            EventKind::PageView => "e_pv",
            EventKind::ChargeRequest => "e_crt",
            EventKind::ChargeSuccess => "e_cs",
            EventKind::ChargeRefund => "e_cr",
            EventKind::Event => "e_e",
        }
    }

    pub fn from_alias(alias: &str) -> Option<Self> {
        match alias.trim() {
            "e_l" => Some(EventKind::Launch),
            "e_pv" => Some(EventKind::PageView),
            "e_crt" => Some(EventKind::ChargeRequest),
            "e_cs" => Some(EventKind::ChargeSuccess),
            "e_cr" => Some(EventKind::ChargeRefund),
            "e_e" => Some(EventKind::Event),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.alias())
    }
}

/// One raw log record. Every field is optional; emitters decide which ones
/// they require.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Event name alias, e.g. `e_l`
    #[serde(rename = "en", default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    #[serde(rename = "u_ud", default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(rename = "u_mid", default, skip_serializing_if = "Option::is_none")]
    pub member_id: Option<String>,
    #[serde(rename = "u_sd", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Server time, milliseconds since the epoch, as a decimal string
    #[serde(rename = "s_time", default, skip_serializing_if = "Option::is_none")]
    pub server_time: Option<String>,
    #[serde(rename = "pl", default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(rename = "b_n", default, skip_serializing_if = "Option::is_none")]
    pub browser_name: Option<String>,
    #[serde(rename = "b_v", default, skip_serializing_if = "Option::is_none")]
    pub browser_version: Option<String>,
    #[serde(rename = "p_ref", default, skip_serializing_if = "Option::is_none")]
    pub referrer_url: Option<String>,
    #[serde(rename = "p_url", default, skip_serializing_if = "Option::is_none")]
    pub current_url: Option<String>,
}

impl RawEvent {
    pub fn event_kind(&self) -> Option<EventKind> {
        self.event_name.as_deref().and_then(EventKind::from_alias)
    }

    pub fn uuid(&self) -> Option<&str> {
        non_blank(self.uuid.as_deref())
    }

    pub fn member_id(&self) -> Option<&str> {
        non_blank(self.member_id.as_deref())
    }

    pub fn session_id(&self) -> Option<&str> {
        non_blank(self.session_id.as_deref())
    }

    pub fn platform(&self) -> Option<&str> {
        non_blank(self.platform.as_deref())
    }

    pub fn browser_name(&self) -> Option<&str> {
        non_blank(self.browser_name.as_deref())
    }

    pub fn browser_version(&self) -> Option<&str> {
        non_blank(self.browser_version.as_deref())
    }

    pub fn referrer_url(&self) -> Option<&str> {
        non_blank(self.referrer_url.as_deref())
    }

    pub fn current_url(&self) -> Option<&str> {
        non_blank(self.current_url.as_deref())
    }

    /// Server time in millis; `None` when blank or not a plain decimal number
    pub fn server_time(&self) -> Option<i64> {
        let raw = non_blank(self.server_time.as_deref())?;
        if !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        raw.parse().ok()
    }
}
