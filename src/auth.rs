use std::{
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use log::{debug, info};

use crate::error::{Error, Result};
use crate::oauth::{AccessToken, RequestToken};

pub const TOKEN_FILE: &str = ".flickr_token";

/// The three legs of the OAuth exchange.
#[async_trait]
pub trait OAuthFlow: Send + Sync {
    async fn request_token(&self) -> Result<RequestToken>;

    fn authorize_url(&self, request_token: &RequestToken) -> Result<String>;

    async fn access_token(
        &self,
        request_token: &RequestToken,
        verifier: &str,
    ) -> Result<AccessToken>;
}

/// Asks the user for the verifier code shown after granting access.
pub trait Prompt {
    fn verifier(&mut self, authorize_url: &str) -> io::Result<String>;
}

/// Prints the authorization URL and reads the verifier from stdin.
pub struct ConsolePrompt;

impl Prompt for ConsolePrompt {
    fn verifier(&mut self, authorize_url: &str) -> io::Result<String> {
        println!();
        println!("Enter the following url in a browser to authorize the application:");
        println!("{authorize_url}");
        println!("Copy and paste the verification code here and press return:");
        io::stdout().flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}

pub fn default_token_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(TOKEN_FILE))
}

/// Loads the stored token, or runs the interactive grant and stores the
/// result for later runs. A freshly granted token is returned right away,
/// so the first run goes on to download instead of asking for a re-run.
pub async fn authenticate<F, P>(flow: &F, prompt: &mut P, token_path: &Path) -> Result<AccessToken>
where
    F: OAuthFlow + ?Sized,
    P: Prompt + ?Sized,
{
    if token_path.exists() {
        debug!("Using token from {}", token_path.display());
        return AccessToken::load(token_path);
    }

    let request_token = flow.request_token().await?;
    let url = flow.authorize_url(&request_token)?;

    let verifier = prompt.verifier(&url)?;
    if verifier.is_empty() {
        return Err(Error::AuthorizationIncomplete);
    }

    let access_token = flow.access_token(&request_token, &verifier).await?;
    access_token.save(token_path)?;
    info!("OAuth token was saved to {}", token_path.display());

    Ok(access_token)
}
