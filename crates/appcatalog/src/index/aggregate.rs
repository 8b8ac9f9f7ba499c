//! Streaming fold of per-tag records into per-application summaries

use tracing::warn;

use crate::entities::{AppSummary, ApplicationInfo, Summary};
use crate::metadata::ApplicationMetadata;

/// Folds a (namespace, application, tag)-sorted record stream in one pass
///
/// Grouping relies on adjacency: records of one application must arrive
/// consecutively.
#[derive(Debug, Default)]
pub struct SummaryFolder {
    groups: Vec<AppSummary>,
    summary: Summary,
}

impl SummaryFolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: &ApplicationInfo) {
        self.summary.tag_count += 1;

        let logos = match ApplicationMetadata::from_yaml(&record.metadata) {
            Ok(metadata) => metadata.logo,
            Err(err) => {
                warn!(
                    catalog_id = %record.catalog_id,
                    error = %err,
                    "unreadable metadata, summarizing without logos"
                );
                Vec::new()
            }
        };

        if let Some(group) = self.groups.last_mut().filter(|group| {
            group.namespace == record.namespace && group.application_name == record.application_name
        }) {
            group.merge_tag(record, logos);
            return;
        }

        let namespace_changed = self
            .groups
            .last()
            .map_or(true, |group| group.namespace != record.namespace);
        if namespace_changed {
            self.summary.namespace_count += 1;
        }
        self.summary.application_count += 1;
        self.groups.push(AppSummary::from_record(record, logos));
    }

    pub fn summary(&self) -> Summary {
        self.summary
    }

    pub fn finish(self) -> (Vec<AppSummary>, Summary) {
        (self.groups, self.summary)
    }
}

impl<'a> FromIterator<&'a ApplicationInfo> for SummaryFolder {
    fn from_iter<I: IntoIterator<Item = &'a ApplicationInfo>>(iter: I) -> Self {
        let mut folder = SummaryFolder::new();
        iter.into_iter().for_each(|record| folder.push(record));
        folder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_id::ApplicationId;

    fn record(namespace: &str, name: &str, tag: &str, metadata: &str) -> ApplicationInfo {
        ApplicationInfo::new(
            &ApplicationId::new(namespace, name, tag),
            "",
            metadata,
            format!("{} {}", name, tag),
            false,
        )
    }

    const WITH_LOGO: &str = "apiVersion: catalog.appcat.dev/v1alpha1\nkind: ApplicationMetadata\nname: Widgets\nlogo:\n  - src: logo.png\n    type: image/png\n    size: 32x32\n";

    #[test]
    fn test_two_applications_in_two_namespaces() {
        let records = vec![
            record("acme", "widgets", "1.0", WITH_LOGO),
            record("acme", "widgets", "1.1", WITH_LOGO),
            record("acme", "widgets", "2.0", WITH_LOGO),
            record("globex", "gadgets", "latest", WITH_LOGO),
            record("globex", "gadgets", "v2", WITH_LOGO),
        ];

        let (groups, summary) = records.iter().collect::<SummaryFolder>().finish();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].application_name, "widgets");
        assert_eq!(groups[0].tag_count(), 3);
        assert_eq!(groups[1].application_name, "gadgets");
        assert_eq!(groups[1].tag_count(), 2);
        assert_eq!(
            summary,
            Summary {
                namespace_count: 2,
                application_count: 2,
                tag_count: 5,
            }
        );
        assert_eq!(groups[0].logos["1.1"][0].src, "logo.png");
        assert_eq!(groups[0].display_names["2.0"], "widgets 2.0");
    }

    #[test]
    fn test_multiple_applications_in_one_namespace() {
        let records = vec![
            record("acme", "gadgets", "1", ""),
            record("acme", "widgets", "1", ""),
            record("acme", "widgets", "2", ""),
        ];

        let (groups, summary) = records.iter().collect::<SummaryFolder>().finish();
        assert_eq!(groups.len(), 2);
        assert_eq!(summary.namespace_count, 1);
        assert_eq!(summary.application_count, 2);
        assert_eq!(summary.tag_count, 3);
    }

    #[test]
    fn test_unparseable_metadata_is_isolated() {
        let records = vec![
            record("acme", "widgets", "1.0", "logo: [unterminated"),
            record("acme", "widgets", "2.0", WITH_LOGO),
        ];

        let (groups, summary) = records.iter().collect::<SummaryFolder>().finish();
        assert_eq!(summary.tag_count, 2);
        assert!(groups[0].logos["1.0"].is_empty());
        assert_eq!(groups[0].logos["2.0"].len(), 1);
    }

    #[test]
    fn test_empty_stream() {
        let (groups, summary) = SummaryFolder::new().finish();
        assert!(groups.is_empty());
        assert_eq!(summary, Summary::default());
    }
}
