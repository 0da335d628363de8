/// One target rendition of the adaptive stream.
///
/// `bandwidth` is the value declared in the master playlist. It is a fixed
/// figure per label, not measured from encoder output; see DESIGN.md.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityProfile {
    pub name: &'static str,
    pub label: &'static str,
    pub bitrate: &'static str,
    pub sample_rate: u32,
    pub bandwidth: u32,
}

/// The configured renditions, highest quality first.
pub const QUALITY_PROFILES: [QualityProfile; 3] = [
    QualityProfile {
        name: "high",
        label: "High Quality",
        bitrate: "320k",
        sample_rate: 48000,
        bandwidth: 320_000,
    },
    QualityProfile {
        name: "med",
        label: "Medium Quality",
        bitrate: "192k",
        sample_rate: 44100,
        bandwidth: 192_000,
    },
    QualityProfile {
        name: "low",
        label: "Low Quality",
        bitrate: "128k",
        sample_rate: 44100,
        bandwidth: 128_000,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_ordered_by_descending_bandwidth() {
        let bandwidths: Vec<u32> = QUALITY_PROFILES.iter().map(|p| p.bandwidth).collect();
        let mut sorted = bandwidths.clone();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        assert_eq!(bandwidths, sorted);
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<_> = QUALITY_PROFILES.iter().map(|p| p.name).collect();
        names.dedup();
        assert_eq!(names.len(), QUALITY_PROFILES.len());
    }
}
