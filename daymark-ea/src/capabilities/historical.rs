//! Static milestone table for exact-date historical lookup

use super::HistoricalKnowledgeBase;
use crate::error::CapabilityError;
use crate::waterfall::types::HistoricalRecord;
use chrono::NaiveDate;
use std::collections::HashMap;

/// (year, month, day, title, description, sources)
type Milestone = (i32, u32, u32, &'static str, &'static str, &'static [&'static str]);

const MILESTONES: &[Milestone] = &[
    (2008, 10, 31, "Bitcoin Whitepaper Published",
     "Satoshi Nakamoto released the paper describing a peer-to-peer electronic cash system on the cryptography mailing list.",
     &["https://bitcoin.org/bitcoin.pdf"]),
    (2009, 1, 3, "Bitcoin Genesis Block Mined",
     "The first block of the Bitcoin chain was mined, embedding a newspaper headline about bank bailouts in its coinbase.",
     &["https://en.bitcoin.it/wiki/Genesis_block"]),
    (2009, 1, 12, "First Bitcoin Transaction",
     "Satoshi Nakamoto sent 10 bitcoin to Hal Finney in block 170, the first transfer between two people.",
     &[]),
    (2010, 5, 10, "Bitcoin Pizza Day",
     "Laszlo Hanyecz paid 10,000 BTC for two pizzas, the first known purchase of a physical good with bitcoin.",
     &["https://bitcointalk.org/index.php?topic=137.0"]),
    (2010, 7, 17, "Mt. Gox Begins Bitcoin Trading",
     "Mt. Gox started operating as a bitcoin exchange and grew into the first major trading venue.",
     &[]),
    (2010, 12, 7, "WikiLeaks Accepts Bitcoin Donations",
     "WikiLeaks began taking bitcoin donations after payment processors cut it off.",
     &[]),
    (2012, 11, 28, "First Bitcoin Halving",
     "The block reward fell from 50 to 25 BTC at height 210,000.",
     &[]),
    (2016, 7, 9, "Second Bitcoin Halving",
     "The block reward fell from 25 to 12.5 BTC at height 420,000.",
     &[]),
    (2017, 8, 1, "Bitcoin Cash Hard Fork",
     "A contentious hard fork over block size split off Bitcoin Cash from the Bitcoin chain.",
     &[]),
    (2020, 5, 11, "Third Bitcoin Halving",
     "The block reward fell from 12.5 to 6.25 BTC at height 630,000.",
     &[]),
    (2020, 8, 11, "MicroStrategy Buys Bitcoin for Its Treasury",
     "MicroStrategy became the first listed company to hold bitcoin as its primary treasury reserve asset.",
     &[]),
    (2021, 2, 8, "Tesla Discloses Bitcoin Purchase",
     "Tesla reported buying $1.5 billion of bitcoin and said it would accept bitcoin for cars.",
     &[]),
    (2021, 9, 7, "El Salvador Adopts Bitcoin as Legal Tender",
     "El Salvador became the first country to make bitcoin legal tender alongside the US dollar.",
     &[]),
    (2021, 11, 14, "Taproot Activates",
     "The Taproot upgrade activated at height 709,632, bringing Schnorr signatures to Bitcoin.",
     &[]),
    (2022, 4, 27, "Central African Republic Adopts Bitcoin",
     "The Central African Republic became the second country to adopt bitcoin as legal tender.",
     &[]),
    (2024, 1, 10, "US Spot Bitcoin ETFs Approved",
     "The SEC approved the first spot bitcoin exchange-traded funds in the United States.",
     &[]),
    (2024, 4, 20, "Fourth Bitcoin Halving",
     "The block reward fell from 6.25 to 3.125 BTC at height 840,000.",
     &[]),
];

/// In-memory exact-date table
pub struct StaticHistoricalKnowledge {
    records: HashMap<NaiveDate, HistoricalRecord>,
}

impl StaticHistoricalKnowledge {
    /// Table of built-in milestones
    pub fn new() -> Self {
        let records = MILESTONES
            .iter()
            .filter_map(|&(year, month, day, title, description, sources)| {
                let date = NaiveDate::from_ymd_opt(year, month, day)?;
                Some(HistoricalRecord {
                    date,
                    title: title.to_string(),
                    description: description.to_string(),
                    sources: sources.iter().map(|s| s.to_string()).collect(),
                })
            });
        Self::with_records(records)
    }

    /// Table holding exactly `records`
    pub fn with_records(records: impl IntoIterator<Item = HistoricalRecord>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.date, r)).collect(),
        }
    }
}

impl Default for StaticHistoricalKnowledge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl HistoricalKnowledgeBase for StaticHistoricalKnowledge {
    async fn lookup(&self, date: NaiveDate) -> Result<Option<HistoricalRecord>, CapabilityError> {
        Ok(self.records.get(&date).cloned())
    }
}
