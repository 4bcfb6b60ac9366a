// Per-station report and image counts, rendered as proportion tables

use std::collections::BTreeMap;
use std::io::Write;

use crate::classifier::ClassifiedGroup;

/// Total and image report counts for one station or pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Count {
    pub total: u64,
    pub images: u64,
}

impl Count {
    pub fn proportion(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.images as f64 / self.total as f64
        }
    }
}

/// Which table to render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountTable {
    Receiver,
    Transmitter,
    Pair,
}

impl CountTable {
    pub const ALL: [CountTable; 3] = [CountTable::Receiver, CountTable::Transmitter, CountTable::Pair];

    /// File suffix used for this table
    pub fn suffix(&self) -> &'static str {
        match self {
            CountTable::Receiver => "rx",
            CountTable::Transmitter => "tx",
            CountTable::Pair => "pair",
        }
    }
}

#[derive(Debug, Default)]
pub struct ReportCounts {
    receivers: BTreeMap<String, Count>,
    transmitters: BTreeMap<String, Count>,
    pairs: BTreeMap<String, Count>,
}

impl ReportCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a classified group: every member towards the totals, its
    /// accepted images towards the image counts
    pub fn add_group(&mut self, group: &ClassifiedGroup) {
        let total = group.len() as u64;
        let images = group.image_count() as u64;

        for (table, id) in [
            (&mut self.receivers, group.key.receiver_id.clone()),
            (&mut self.transmitters, group.key.transmitter_id.clone()),
            (&mut self.pairs, group.key.to_string()),
        ] {
            let count = table.entry(id).or_default();
            count.total += total;
            count.images += images;
        }
    }

    pub fn get(&self, table: CountTable, id: &str) -> Count {
        self.table(table).get(id).copied().unwrap_or_default()
    }

    fn table(&self, table: CountTable) -> &BTreeMap<String, Count> {
        match table {
            CountTable::Receiver => &self.receivers,
            CountTable::Transmitter => &self.transmitters,
            CountTable::Pair => &self.pairs,
        }
    }

    /// Write `<id> <total> <images> <proportion>` for every entry with images
    pub fn write_table<W: Write>(&self, table: CountTable, out: &mut W) -> std::io::Result<()> {
        for (id, count) in self.table(table) {
            if count.images == 0 {
                continue;
            }
            writeln!(out, "{} {} {} {:.6}", id, count.total, count.images, count.proportion())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ImageClassifier;
    use crate::grouper::Group;
    use crate::report::test_report;

    fn classify(reports: Vec<crate::report::Report>) -> ClassifiedGroup {
        ImageClassifier::default().classify(Group {
            key: reports[0].key(),
            epoch_time: reports[0].epoch_time,
            reports,
        })
    }

    #[test]
    fn test_counts_and_table() {
        let mut counts = ReportCounts::new();
        counts.add_group(&classify(vec![
            test_report("T1", "R1", 14.097000, -10.0, 100),
            test_report("T1", "R1", 14.096813, -18.0, 100),
            test_report("T1", "R1", 14.096940, -19.0, 100),
        ]));
        counts.add_group(&classify(vec![test_report("T2", "R1", 7.0386, -3.0, 100)]));

        assert_eq!(counts.get(CountTable::Receiver, "R1"), Count { total: 4, images: 1 });
        assert_eq!(counts.get(CountTable::Transmitter, "T2"), Count { total: 1, images: 0 });
        assert_eq!(counts.get(CountTable::Pair, "T1,R1"), Count { total: 3, images: 1 });
        assert_eq!(counts.get(CountTable::Pair, "T9,R9"), Count::default());

        let mut out = Vec::new();
        counts.write_table(CountTable::Transmitter, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "T1 3 1 0.333333\n");

        let mut out = Vec::new();
        counts.write_table(CountTable::Receiver, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "R1 4 1 0.250000\n");
    }

    #[test]
    fn test_proportion_of_empty_count() {
        assert_eq!(Count::default().proportion(), 0.0);
    }
}
