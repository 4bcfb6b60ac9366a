// Image classifier - reference selection and offset classification per group

use serde::Serialize;

use crate::constants::OFFSET_SCALE;
use crate::grouper::Group;
use crate::harmonic::{HarmonicPolicy, MainsFamily};
use crate::report::{PairKey, Report};

/// Role of a report within its classified group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReportClass {
    /// Only report for its key in the window
    Singleton,
    /// Highest SNR member of a multi-report group
    Reference,
    /// Same frequency as the reference; not an image
    Coincident,
    /// Offset lines up with a mains multiple
    HarmonicArtifact(MainsFamily),
    /// Genuine image report
    Image,
}

/// A report plus the values computed for it by the classifier.
///
/// Both derived values are set once, when the group is classified.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedReport {
    pub report: Report,
    frequency_offset: i64,
    reference_snr: f64,
    class: ReportClass,
}

impl ClassifiedReport {
    /// Offset from the reference frequency, in millionths of the frequency unit
    pub fn frequency_offset(&self) -> i64 {
        self.frequency_offset
    }

    /// SNR of the group's reference report
    pub fn reference_snr(&self) -> f64 {
        self.reference_snr
    }

    /// Measured SNR relative to the reference (0 for the reference itself)
    pub fn relative_snr(&self) -> f64 {
        self.report.snr - self.reference_snr
    }

    pub fn class(&self) -> ReportClass {
        self.class
    }

    pub fn is_image(&self) -> bool {
        self.class == ReportClass::Image
    }

    pub fn is_artifact(&self) -> bool {
        matches!(self.class, ReportClass::HarmonicArtifact(_))
    }
}

/// A group after classification. `members[0]` is always the reference and
/// the remaining members follow in descending SNR order.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedGroup {
    pub key: PairKey,
    pub epoch_time: u64,
    members: Vec<ClassifiedReport>,
}

impl ClassifiedGroup {
    pub fn members(&self) -> &[ClassifiedReport] {
        &self.members
    }

    pub fn reference(&self) -> &ClassifiedReport {
        &self.members[0]
    }

    pub fn is_singleton(&self) -> bool {
        self.members.len() == 1
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Members other than the reference
    pub fn peers(&self) -> &[ClassifiedReport] {
        &self.members[1..]
    }

    pub fn images(&self) -> impl Iterator<Item = &ClassifiedReport> {
        self.members.iter().filter(|m| m.is_image())
    }

    pub fn artifacts(&self) -> impl Iterator<Item = &ClassifiedReport> {
        self.members.iter().filter(|m| m.is_artifact())
    }

    pub fn image_count(&self) -> usize {
        self.images().count()
    }

    pub fn has_images(&self) -> bool {
        self.members.iter().any(ClassifiedReport::is_image)
    }

    /// Drop the derived values and recover the group, reference first
    pub fn into_group(self) -> Group {
        Group {
            key: self.key,
            epoch_time: self.epoch_time,
            reports: self.members.into_iter().map(|m| m.report).collect(),
        }
    }
}

/// Applies reference selection and the harmonic policy to groups
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageClassifier {
    pub policy: HarmonicPolicy,
}

impl ImageClassifier {
    pub fn new(policy: HarmonicPolicy) -> Self {
        ImageClassifier { policy }
    }

    /// Classify every member of a non-empty group.
    ///
    /// Members are stably sorted by descending SNR, so equal SNRs keep their
    /// arrival order and the earliest of them becomes the reference.
    pub fn classify(&self, group: Group) -> ClassifiedGroup {
        let Group {
            key,
            epoch_time,
            mut reports,
        } = group;
        // the grouper never builds an empty group
        debug_assert!(!reports.is_empty());

        if reports.len() == 1 {
            let members = reports
                .into_iter()
                .map(|report| ClassifiedReport {
                    reference_snr: report.snr,
                    report,
                    frequency_offset: 0,
                    class: ReportClass::Singleton,
                })
                .collect();
            return ClassifiedGroup { key, epoch_time, members };
        }

        reports.sort_by(|a, b| b.snr.total_cmp(&a.snr));
        let reference_frequency = reports[0].frequency;
        let reference_snr = reports[0].snr;

        let members = reports
            .into_iter()
            .enumerate()
            .map(|(i, report)| {
                let (frequency_offset, class) = if i == 0 {
                    (0, ReportClass::Reference)
                } else {
                    let offset = frequency_offset(report.frequency, reference_frequency);
                    let class = if offset == 0 {
                        ReportClass::Coincident
                    } else if let Some(family) = self.policy.classify(offset) {
                        ReportClass::HarmonicArtifact(family)
                    } else {
                        ReportClass::Image
                    };
                    (offset, class)
                };
                ClassifiedReport {
                    report,
                    frequency_offset,
                    reference_snr,
                    class,
                }
            })
            .collect();

        ClassifiedGroup { key, epoch_time, members }
    }
}

/// Offset of `frequency` from `reference`, rounded to the nearest whole
/// millionth of the frequency unit (half away from zero).
pub fn frequency_offset(frequency: f64, reference: f64) -> i64 {
    (OFFSET_SCALE * (frequency - reference)).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::test_report;

    fn group(reports: Vec<Report>) -> Group {
        Group {
            key: reports[0].key(),
            epoch_time: reports[0].epoch_time,
            reports,
        }
    }

    #[test]
    fn test_singleton() {
        let classified = ImageClassifier::default().classify(group(vec![test_report("T1", "R1", 14.097, -12.0, 100)]));
        assert!(classified.is_singleton());
        let r = classified.reference();
        assert_eq!(r.class(), ReportClass::Singleton);
        assert_eq!(r.frequency_offset(), 0);
        assert_eq!(r.reference_snr(), -12.0);
        assert!(!classified.has_images());
    }

    #[test]
    fn test_sixty_hz_artifact() {
        let classified = ImageClassifier::default().classify(group(vec![
            test_report("T1", "R1", 14.097000, -10.0, 100),
            test_report("T1", "R1", 14.096940, -18.0, 100),
        ]));
        let reference = classified.reference();
        assert_eq!(reference.report.snr, -10.0);
        assert_eq!(reference.class(), ReportClass::Reference);
        assert_eq!(reference.frequency_offset(), 0);

        let peer = &classified.peers()[0];
        assert_eq!(peer.frequency_offset(), -60);
        assert_eq!(peer.class(), ReportClass::HarmonicArtifact(MainsFamily::Hz60));
        assert_eq!(peer.reference_snr(), -10.0);
        assert_eq!(peer.relative_snr(), -8.0);
        assert_eq!(peer.report.snr, -18.0);
        assert!(!classified.has_images());
        assert_eq!(classified.artifacts().count(), 1);
    }

    #[test]
    fn test_genuine_image() {
        let classified = ImageClassifier::default().classify(group(vec![
            test_report("T1", "R1", 14.096813, -18.0, 100),
            test_report("T1", "R1", 14.097000, -10.0, 100),
        ]));
        assert_eq!(classified.reference().report.snr, -10.0);
        let peer = &classified.peers()[0];
        assert_eq!(peer.frequency_offset(), -187);
        assert_eq!(peer.class(), ReportClass::Image);
        assert!(classified.has_images());
        assert_eq!(classified.image_count(), 1);
    }

    #[test]
    fn test_reference_has_max_snr_and_ties_keep_arrival_order() {
        let mut first = test_report("T1", "R1", 14.097100, -7.0, 100);
        first.spot_id = 1;
        let mut second = test_report("T1", "R1", 14.097000, -7.0, 100);
        second.spot_id = 2;
        let low = test_report("T1", "R1", 14.097300, -20.0, 100);

        let classified = ImageClassifier::default().classify(group(vec![low, first, second]));
        assert_eq!(classified.reference().report.spot_id, 1);
        assert_eq!(classified.peers()[0].report.spot_id, 2);
        assert_eq!(classified.peers()[0].frequency_offset(), -100);
        assert_eq!(classified.peers()[1].frequency_offset(), 200);
        let max = classified.members().iter().map(|m| m.report.snr).fold(f64::MIN, f64::max);
        assert_eq!(classified.reference().report.snr, max);
    }

    #[test]
    fn test_exactly_one_reference() {
        let classified = ImageClassifier::default().classify(group(vec![
            test_report("T1", "R1", 14.097000, -10.0, 100),
            test_report("T1", "R1", 14.097000, -15.0, 100),
            test_report("T1", "R1", 14.097050, -16.0, 100),
            test_report("T1", "R1", 14.097333, -17.0, 100),
        ]));
        let refs = classified
            .members()
            .iter()
            .filter(|m| m.class() == ReportClass::Reference)
            .count();
        assert_eq!(refs, 1);
        assert_eq!(classified.peers()[0].class(), ReportClass::Coincident);
        assert_eq!(classified.peers()[1].class(), ReportClass::HarmonicArtifact(MainsFamily::Hz50));
        assert_eq!(classified.peers()[2].class(), ReportClass::Image);
    }

    #[test]
    fn test_reclassify_is_idempotent() {
        let classifier = ImageClassifier::default();
        let first = classifier.classify(group(vec![
            test_report("T1", "R1", 14.096813, -18.0, 100),
            test_report("T1", "R1", 14.097000, -10.0, 100),
            test_report("T1", "R1", 14.097121, -12.0, 100),
        ]));
        let offsets: Vec<i64> = first.members().iter().map(|m| m.frequency_offset()).collect();

        let second = classifier.classify(first.clone().into_group());
        let again: Vec<i64> = second.members().iter().map(|m| m.frequency_offset()).collect();
        assert_eq!(offsets, again);
        assert_eq!(first, second);
    }

    #[test]
    fn test_frequency_offset_rounding() {
        assert_eq!(frequency_offset(14.0971876, 14.097), 188);
        assert_eq!(frequency_offset(14.0968124, 14.097), -188);
        assert_eq!(frequency_offset(14.0971874, 14.097), 187);
        assert_eq!(frequency_offset(14.097, 14.097), 0);
    }
}
