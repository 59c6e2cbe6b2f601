use serde::{Deserialize, Serialize};

use crate::{Error, Instrument, Result};

/// The fixed set of instruments the bot knows how to watch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentCatalog {
    instruments: Vec<Instrument>,
}

impl InstrumentCatalog {
    pub fn new(instruments: Vec<Instrument>) -> Self {
        Self { instruments }
    }

    /// Resolve an operator-supplied identifier, matching either the display
    /// name or the source code, case-insensitively.
    pub fn lookup(&self, id: &str) -> Result<&Instrument> {
        let id = id.trim();
        self.instruments
            .iter()
            .find(|i| i.name.eq_ignore_ascii_case(id) || i.code.eq_ignore_ascii_case(id))
            .ok_or_else(|| Error::UnknownInstrument(id.to_string()))
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}

impl Default for InstrumentCatalog {
    fn default() -> Self {
        Self::new(vec![
            Instrument::new("EUR/USD", "EURUSD=X"),
            Instrument::new("GBP/USD", "GBPUSD=X"),
            Instrument::new("USD/JPY", "JPY=X"),
        ])
    }
}
