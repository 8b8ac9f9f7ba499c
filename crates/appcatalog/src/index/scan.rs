use crate::entities::ApplicationInfo;

use super::{IndexBackend, IndexError, PageToken, TermQuery};

/// Page through every hit of `query`, handing records to `visit` in order
///
/// The scan ends when the running count equals the total reported by the
/// backend, or when a page comes back empty. The total is assumed stable for
/// the duration of the scan; concurrent writes can split or repeat groups.
pub(crate) async fn scan_each<F>(
    backend: &dyn IndexBackend,
    query: &TermQuery,
    page_size: usize,
    mut visit: F,
) -> Result<u64, IndexError>
where
    F: FnMut(ApplicationInfo) + Send,
{
    let page_size = page_size.max(1);
    let mut token = PageToken::start();
    let mut seen = 0u64;

    loop {
        let page = backend.page_scan(query, token, page_size).await?;
        if page.records.is_empty() {
            break;
        }

        seen += page.records.len() as u64;
        page.records.into_iter().for_each(&mut visit);

        if seen == page.total {
            break;
        }
        token = page.next;
    }

    Ok(seen)
}
