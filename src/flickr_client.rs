use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use reqwest::{Client, header};
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::OAuthFlow;
use crate::downloader::PhotoFetcher;
use crate::error::{Error, Result};
use crate::model::{
    LoginResponse, LoginUser, PeoplePhotos, Photo, PhotoInfoResponse, PhotoPage, Photoset,
    PhotosetListResponse, SetPhotos, SizesResponse, Status,
};
use crate::oauth::{self, AccessToken, Consumer, RequestToken};
use crate::pager::{Listing, PAGE_SIZE, PhotoSource};

const USER_AGENT: &str = concat!("flickr_downloader/", env!("CARGO_PKG_VERSION"));

const REST_URL: &str = "https://api.flickr.com/services/rest";
const REQUEST_TOKEN_URL: &str = "https://www.flickr.com/services/oauth/request_token";
const AUTHORIZE_URL: &str = "https://www.flickr.com/services/oauth/authorize";
const ACCESS_TOKEN_URL: &str = "https://www.flickr.com/services/oauth/access_token";

/// Extra fields requested with every listing so photos need no further lookup.
const LISTING_EXTRAS: &str = "date_taken,url_o";

/// A session against the Flickr API: application keys, the user's access
/// token once known, and the HTTP client.
pub struct FlickrClient {
    consumer: Consumer,
    token: Option<AccessToken>,
    client: Client,
}

impl FlickrClient {
    pub fn new(consumer: Consumer) -> Result<FlickrClient> {
        Ok(FlickrClient {
            consumer,
            token: None,
            client: Self::build_client()?,
        })
    }

    fn build_client() -> Result<Client> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(USER_AGENT),
        );

        Ok(reqwest::Client::builder()
            .default_headers(headers)
            .build()?)
    }

    pub fn with_token(mut self, token: AccessToken) -> FlickrClient {
        self.token = Some(token);
        self
    }

    fn token_pair(&self) -> Option<(&str, &str)> {
        self.token
            .as_ref()
            .map(|t| (t.oauth_token.as_str(), t.oauth_token_secret.as_str()))
    }

    /// Signed query parameters for a REST method call.
    fn rest_params(
        &self,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<(String, String)>> {
        let mut all = vec![
            ("method".to_string(), method.to_string()),
            ("format".to_string(), "json".to_string()),
            ("nojsoncallback".to_string(), "1".to_string()),
        ];
        all.extend(params.iter().map(|(k, v)| (k.to_string(), v.to_string())));

        oauth::sign("GET", REST_URL, all, &self.consumer, self.token_pair())
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: &[(&str, &str)]) -> Result<T> {
        debug!("Calling {method}");
        let query = self.rest_params(method, params)?;
        let response = self
            .client
            .get(REST_URL)
            .query(&query)
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        let status = serde_json::from_str::<Status>(&body)?;
        if !status.is_ok() {
            return Err(Error::Api {
                code: status.code,
                message: status.message,
            });
        }

        Ok(serde_json::from_str::<T>(&body)?)
    }

    async fn token_request(
        &self,
        url: &str,
        params: Vec<(String, String)>,
        token: Option<(&str, &str)>,
    ) -> Result<String> {
        let query = oauth::sign("GET", url, params, &self.consumer, token)?;
        let response = self.client.get(url).query(&query).send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!("Token endpoint answered {status}");
        Ok(body)
    }

    /// The user the token belongs to.
    pub async fn login(&self) -> Result<LoginUser> {
        let response: LoginResponse = self.call("flickr.test.login", &[]).await?;
        Ok(response.user)
    }

    /// Every photoset of a user.
    pub async fn photosets(&self, user_id: &str) -> Result<Vec<Photoset>> {
        let per_page = PAGE_SIZE.to_string();
        let mut sets = Vec::new();
        let mut page = 1;

        loop {
            let page_string = page.to_string();
            let response: PhotosetListResponse = self
                .call(
                    "flickr.photosets.getList",
                    &[
                        ("user_id", user_id),
                        ("page", page_string.as_str()),
                        ("per_page", per_page.as_str()),
                    ],
                )
                .await?;

            let list = response.photosets;
            let count = list.photoset.len();
            sets.extend(list.photoset);
            if count == 0 || page >= list.pages {
                break;
            }
            page += 1;
        }

        Ok(sets)
    }

    async fn largest_size_url(&self, photo: &Photo) -> Result<String> {
        let response: SizesResponse = self
            .call("flickr.photos.getSizes", &[("photo_id", photo.id.as_str())])
            .await?;

        response
            .sizes
            .largest()
            .map(|size| size.source.clone())
            .ok_or_else(|| Error::NoSource(photo.id.clone()))
    }
}

#[async_trait]
impl PhotoSource for FlickrClient {
    async fn photos_page(&self, listing: &Listing, page: u32, per_page: u32) -> Result<PhotoPage> {
        let page = page.to_string();
        let per_page = per_page.to_string();

        match listing {
            Listing::User(user_id) => {
                let response: PeoplePhotos = self
                    .call(
                        "flickr.people.getPhotos",
                        &[
                            ("user_id", user_id.as_str()),
                            ("extras", LISTING_EXTRAS),
                            ("page", page.as_str()),
                            ("per_page", per_page.as_str()),
                        ],
                    )
                    .await?;
                Ok(response.photos)
            }
            Listing::Set(set_id) => {
                let response: SetPhotos = self
                    .call(
                        "flickr.photosets.getPhotos",
                        &[
                            ("photoset_id", set_id.as_str()),
                            ("extras", LISTING_EXTRAS),
                            ("page", page.as_str()),
                            ("per_page", per_page.as_str()),
                        ],
                    )
                    .await?;
                Ok(response.photoset)
            }
        }
    }
}

#[async_trait]
impl PhotoFetcher for FlickrClient {
    async fn fetch_photo(&self, photo: &Photo) -> Result<Bytes> {
        let url = match &photo.url_o {
            Some(url) => url.clone(),
            None => self.largest_size_url(photo).await?,
        };

        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?)
    }

    async fn date_taken(&self, photo: &Photo) -> Result<String> {
        let response: PhotoInfoResponse = self
            .call("flickr.photos.getInfo", &[("photo_id", photo.id.as_str())])
            .await?;
        Ok(response.photo.dates.taken)
    }
}

#[async_trait]
impl OAuthFlow for FlickrClient {
    async fn request_token(&self) -> Result<RequestToken> {
        let params = vec![("oauth_callback".to_string(), "oob".to_string())];
        let body = self.token_request(REQUEST_TOKEN_URL, params, None).await?;
        oauth::request_token_from(&body)
    }

    fn authorize_url(&self, request_token: &RequestToken) -> Result<String> {
        let url = Url::parse_with_params(
            AUTHORIZE_URL,
            &[
                ("oauth_token", request_token.oauth_token.as_str()),
                ("perms", "read"),
            ],
        )
        .map_err(|e| Error::OAuth(e.to_string()))?;
        Ok(url.to_string())
    }

    async fn access_token(
        &self,
        request_token: &RequestToken,
        verifier: &str,
    ) -> Result<AccessToken> {
        let params = vec![("oauth_verifier".to_string(), verifier.to_string())];
        let token = Some((
            request_token.oauth_token.as_str(),
            request_token.oauth_token_secret.as_str(),
        ));
        let body = self.token_request(ACCESS_TOKEN_URL, params, token).await?;
        oauth::access_token_from(&body)
    }
}
