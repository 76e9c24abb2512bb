//! Shunt delivery docket parsing

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Litres delivered to the shunt vehicle on one docket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShuntDocket {
    pub docket_number: String,
    pub shunt_qty: i64,
}

/// Shunt dockets keyed by docket number
pub type ShuntMap = HashMap<String, ShuntDocket>;

fn docket_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)Delivery Docket No\.\s*:\s*(\d+)").expect("valid docket regex"))
}

fn shunt_qty_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)ATTSHUNT.*?(\d+)").expect("valid shunt regex"))
}

/// Parse a docket's text. Both the docket number and the ATTSHUNT quantity must be present.
pub fn parse_shunt_docket(text: &str) -> Option<ShuntDocket> {
    let docket_number = docket_number_re().captures(text)?.get(1)?.as_str().to_string();
    let shunt_qty = shunt_qty_re().captures(text)?.get(1)?.as_str().parse().ok()?;

    Some(ShuntDocket {
        docket_number,
        shunt_qty,
    })
}

/// Index dockets by number; a later docket replaces an earlier one with the same number
pub fn build_shunt_map(dockets: impl IntoIterator<Item = ShuntDocket>) -> ShuntMap {
    dockets
        .into_iter()
        .map(|docket| (docket.docket_number.clone(), docket))
        .collect()
}
