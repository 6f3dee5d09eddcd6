use async_trait::async_trait;
use log::{debug, info};

use crate::error::Result;
use crate::model::{Photo, PhotoPage};

pub const PAGE_SIZE: u32 = 500;

/// What to enumerate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    /// Photostream of the given user.
    User(String),
    /// Photos of a photoset.
    Set(String),
}

#[async_trait]
pub trait PhotoSource: Send + Sync {
    async fn photos_page(&self, listing: &Listing, page: u32, per_page: u32) -> Result<PhotoPage>;
}

/// Requests pages until the listing is exhausted and returns every photo in
/// listing order.
///
/// The listing ends on a short or empty page, once the reported page count
/// is reached, or when the service answers with the "no more results" code.
/// Any other error aborts.
pub async fn fetch_all_photos<S>(source: &S, listing: &Listing) -> Result<Vec<Photo>>
where
    S: PhotoSource + ?Sized,
{
    let mut photos: Vec<Photo> = Vec::new();
    let mut page = 1;

    loop {
        info!("Getting page {page}");
        let model = match source.photos_page(listing, page, PAGE_SIZE).await {
            Ok(model) => model,
            Err(e) if e.is_no_more_results() => {
                debug!("No more results after page {}", page - 1);
                break;
            }
            Err(e) => return Err(e),
        };

        let count = model.photo.len();
        debug!(
            "Page {number} of {pages} holds {count} of {total} photos",
            number = model.page,
            pages = model.pages,
            total = model.total
        );
        photos.extend(model.photo);

        let last_reported = model.pages > 0 && page >= model.pages;
        if count < PAGE_SIZE as usize || last_reported {
            break;
        }
        page += 1;
    }

    Ok(photos)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::Error;

    struct FakeSource {
        pages: Vec<Vec<Photo>>,
        report_pages: bool,
        fail_with: Option<(u32, u32)>,
        requested: Mutex<Vec<u32>>,
    }

    impl FakeSource {
        fn with_sizes(sizes: &[usize]) -> FakeSource {
            let mut next_id = 0;
            let pages = sizes
                .iter()
                .map(|size| {
                    (0..*size)
                        .map(|_| {
                            next_id += 1;
                            Photo::new(&next_id.to_string(), "photo")
                        })
                        .collect()
                })
                .collect();

            FakeSource {
                pages,
                report_pages: false,
                fail_with: None,
                requested: Mutex::new(Vec::new()),
            }
        }

        fn requested(&self) -> Vec<u32> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PhotoSource for FakeSource {
        async fn photos_page(
            &self,
            _listing: &Listing,
            page: u32,
            per_page: u32,
        ) -> Result<PhotoPage> {
            assert_eq!(PAGE_SIZE, per_page);
            self.requested.lock().unwrap().push(page);

            if let Some((fail_page, code)) = self.fail_with {
                if page == fail_page {
                    return Err(Error::Api {
                        code,
                        message: "failure".into(),
                    });
                }
            }

            let photo = self
                .pages
                .get(page as usize - 1)
                .cloned()
                .unwrap_or_default();
            Ok(PhotoPage {
                page,
                pages: if self.report_pages {
                    self.pages.len() as u32
                } else {
                    0
                },
                total: 0,
                photo,
            })
        }
    }

    fn ids(photos: &[Photo]) -> Vec<String> {
        photos.iter().map(|p| p.id.clone()).collect()
    }

    fn listing() -> Listing {
        Listing::User("12345678@N00".into())
    }

    #[tokio::test]
    async fn short_last_page_ends_listing() {
        let source = FakeSource::with_sizes(&[500, 500, 120]);

        let photos = fetch_all_photos(&source, &listing()).await.unwrap();

        let expected: Vec<String> = (1..=1120).map(|i| i.to_string()).collect();
        assert_eq!(expected, ids(&photos));
        assert_eq!(vec![1, 2, 3], source.requested());
    }

    #[tokio::test]
    async fn exact_multiple_stops_on_empty_page() {
        let source = FakeSource::with_sizes(&[500, 500]);

        let photos = fetch_all_photos(&source, &listing()).await.unwrap();

        assert_eq!(1000, photos.len());
        assert_eq!(vec![1, 2, 3], source.requested());
    }

    #[tokio::test]
    async fn exact_multiple_stops_on_reported_page_count() {
        let mut source = FakeSource::with_sizes(&[500, 500]);
        source.report_pages = true;

        let photos = fetch_all_photos(&source, &listing()).await.unwrap();

        assert_eq!(1000, photos.len());
        assert_eq!(vec![1, 2], source.requested());
    }

    #[tokio::test]
    async fn no_more_results_code_ends_listing() {
        let mut source = FakeSource::with_sizes(&[500, 500, 500]);
        source.fail_with = Some((3, crate::error::NO_MORE_RESULTS));

        let photos = fetch_all_photos(&source, &listing()).await.unwrap();

        assert_eq!(1000, photos.len());
    }

    #[tokio::test]
    async fn other_api_errors_abort() {
        let mut source = FakeSource::with_sizes(&[500, 500, 500]);
        source.fail_with = Some((2, 105));

        let result = fetch_all_photos(&source, &listing()).await;

        assert!(matches!(result, Err(Error::Api { code: 105, .. })));
    }

    #[tokio::test]
    async fn empty_account() {
        let source = FakeSource::with_sizes(&[]);

        let photos = fetch_all_photos(&source, &Listing::Set("721".into()))
            .await
            .unwrap();

        assert!(photos.is_empty());
        assert_eq!(vec![1], source.requested());
    }
}
