use crate::error::CycleError;
use crate::services::FileCandidate;
use crate::services::HostingService;
use crate::state::PersistedState;
use crate::state::StateStore;
use tracing::debug;

/// MIME types the classifier accepts.
pub const SUPPORTED_MIME_TYPES: &[&str] = &["image/png", "image/jpeg", "image/gif"];

/// One page worth of eligible files, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub candidates: Vec<FileCandidate>,
    /// Newest file id on the raw page. Once every candidate has been handled
    /// the cursor may jump here, past the page's ineligible files.
    pub page_head: String,
}

/// Walks the hosting service's file listing forward from the persisted
/// cursor.
pub struct ChangeFeed<'a, H: ?Sized> {
    hosting: &'a H,
    page_size: u32,
    min_size: u64,
}

impl<'a, H: HostingService + ?Sized> ChangeFeed<'a, H> {
    pub fn new(hosting: &'a H, page_size: u32, min_size: u64) -> Self {
        Self {
            hosting,
            page_size,
            min_size,
        }
    }

    pub fn is_eligible(&self, file: &FileCandidate) -> bool {
        SUPPORTED_MIME_TYPES.contains(&file.mime_type.as_str())
            && !file.already_sensitive
            && file.size.unwrap_or(0) >= self.min_size
    }

    /// Fetches pages until one contains an eligible file, persisting the
    /// cursor past every page that has none. Returns `None` once the feed
    /// runs dry, leaving the cursor where it was.
    pub async fn next_batch(
        &self,
        state: &mut PersistedState,
        store: &StateStore,
    ) -> Result<Option<Batch>, CycleError> {
        loop {
            let page = self
                .hosting
                .list_files(self.page_size, state.cursor.as_deref())
                .await?;
            let Some(page_head) = page
                .iter()
                .max_by_key(|file| file.created_at)
                .map(|file| file.id.clone())
            else {
                debug!(cursor = state.cursor.as_deref(), "feed exhausted");
                return Ok(None);
            };

            let page_len = page.len();
            let mut candidates: Vec<FileCandidate> = page
                .into_iter()
                .filter(|file| self.is_eligible(file))
                .collect();

            if candidates.is_empty() {
                debug!(page_len, page_head = %page_head, "no eligible files on page, skipping");
                state.cursor = Some(page_head);
                store.save(state)?;
                continue;
            }

            candidates.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            debug!(page_len, eligible = candidates.len(), "fetched batch");
            return Ok(Some(Batch {
                candidates,
                page_head,
            }));
        }
    }
}
