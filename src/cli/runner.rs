//! CLI runner - executes commands

use crate::api::{
    ExportFile, ExportRequest, GenerateRequest, GeneratedPage, MatchRequest, PageSupplier,
    PinCartApi, Plan, Tone,
};
use crate::auth::{Session, SessionTokenProvider};
use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::ClientSettings;
use crate::error::{Error, Result, ResultExt};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Settings after applying file, environment and flags
    pub fn settings(&self) -> Result<ClientSettings> {
        let mut settings = ClientSettings::load(self.cli.config.as_deref())?;
        if let Some(url) = &self.cli.api_url {
            settings.base_url.clone_from(url);
        }
        if let Some(retries) = self.cli.retries {
            settings.max_retries = retries;
        }
        settings.validate()?;
        Ok(settings)
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let settings = self.settings()?;
        self.run_with(&settings).await
    }

    /// Run the CLI command with already loaded settings
    pub async fn run_with(&self, settings: &ClientSettings) -> Result<()> {
        let api = || settings.build_api();

        match &self.cli.command {
            Commands::Login {
                email,
                password,
                save,
            } => self.login(settings, email, password, save.as_deref()).await,
            Commands::Discover { keywords } => self.discover(&api()?, keywords).await,
            Commands::Match { title, image_url } => {
                self.match_product(&api()?, title, image_url.as_deref())
                    .await
            }
            Commands::Generate {
                name,
                audience,
                tone,
                supplier_price,
                retail_price,
                image_url,
                user_id,
                save,
            } => {
                let request = build_generate_request(
                    name,
                    audience,
                    *tone,
                    *supplier_price,
                    user_id.as_deref(),
                );
                let supplier = supplier_price.zip(*retail_price).map(|(cost, retail)| {
                    PageSupplier {
                        unit_cost: cost,
                        suggested_retail: retail,
                        image: image_url.clone(),
                    }
                });
                self.generate(&api()?, &request, supplier, save.as_deref())
                    .await
            }
            Commands::Export { from, output } => {
                self.export(&api()?, from, output.as_deref()).await
            }
            Commands::Checkout {
                user_id,
                email,
                plan,
            } => self.checkout(&api()?, user_id, email, *plan).await,
            Commands::Portal { user_id, email } => self.portal(&api()?, user_id, email).await,
            Commands::Run {
                keyword,
                audience,
                tone,
                user_id,
                output,
            } => {
                self.pipeline(
                    &api()?,
                    keyword,
                    audience,
                    *tone,
                    user_id.as_deref(),
                    output.as_deref(),
                )
                .await
            }
        }
    }

    /// Password sign-in against the identity provider
    async fn login(
        &self,
        settings: &ClientSettings,
        email: &str,
        password: &str,
        save: Option<&Path>,
    ) -> Result<()> {
        let provider = SessionTokenProvider::new(settings.auth.clone());
        let session = provider.password_login(email, password).await?;
        info!("Signed in as {email}");

        if let Some(path) = save {
            save_session(path, settings, &session).await?;
            info!("Saved session to {}", path.display());
        }

        self.output(&session);
        Ok(())
    }

    /// Discover one or more keywords concurrently
    async fn discover(&self, api: &PinCartApi, keywords: &[String]) -> Result<()> {
        if let [keyword] = keywords {
            let response = api.discover(keyword).await?;
            self.output(&response);
            return Ok(());
        }

        let mut failures = 0;
        for (keyword, result) in api.discover_many(keywords).await {
            match result {
                Ok(response) => self.output(&response),
                Err(e) => {
                    failures += 1;
                    warn!("Discover '{keyword}' failed: {e}");
                    self.output(&json!({
                        "keyword": keyword,
                        "error": e.user_message(),
                        "status": e.status(),
                    }));
                }
            }
        }

        if failures == keywords.len() {
            return Err(Error::Other(format!(
                "Discovery failed for all {failures} keywords"
            )));
        }
        Ok(())
    }

    async fn match_product(
        &self,
        api: &PinCartApi,
        title: &str,
        image_url: Option<&str>,
    ) -> Result<()> {
        let request = MatchRequest {
            product_title: title.to_string(),
            image_url: image_url.map(String::from),
        };
        let response = api.match_product(&request).await?;
        self.output(&response);
        Ok(())
    }

    async fn generate(
        &self,
        api: &PinCartApi,
        request: &GenerateRequest,
        supplier: Option<PageSupplier>,
        save: Option<&Path>,
    ) -> Result<()> {
        let response = api.generate(request).await?;
        let page = GeneratedPage {
            product_name: response.product_name,
            generated: response.generated,
            supplier,
        };

        if let Some(path) = save {
            let content = serde_json::to_string_pretty(&page)?;
            tokio::fs::write(path, content)
                .await
                .with_context(|| format!("Cannot save generated page to {}", path.display()))?;
            info!("Saved generated page to {}", path.display());
        }

        self.output(&page);
        Ok(())
    }

    async fn export(&self, api: &PinCartApi, from: &Path, output: Option<&Path>) -> Result<()> {
        let content = tokio::fs::read_to_string(from)
            .await
            .with_context(|| format!("Cannot read generated page {}", from.display()))?;
        let page: GeneratedPage = serde_json::from_str(&content)?;

        let file = api.export(&ExportRequest::from_page(&page)).await?;
        let path = save_export(&file, output).await?;
        self.output(&export_summary(&file, &path));
        Ok(())
    }

    async fn checkout(
        &self,
        api: &PinCartApi,
        user_id: &str,
        email: &str,
        plan: Plan,
    ) -> Result<()> {
        let session = api.create_checkout(user_id, email, plan).await?;
        self.output(&session);
        Ok(())
    }

    async fn portal(&self, api: &PinCartApi, user_id: &str, email: &str) -> Result<()> {
        let session = api.create_portal(user_id, email).await?;
        self.output(&session);
        Ok(())
    }

    /// Discover → top product → cheapest supplier → generate → export
    async fn pipeline(
        &self,
        api: &PinCartApi,
        keyword: &str,
        audience: &str,
        tone: Tone,
        user_id: Option<&str>,
        output: Option<&Path>,
    ) -> Result<()> {
        let discovered = api.discover(keyword).await?;
        let product = discovered
            .top_product()
            .ok_or_else(|| Error::Other(format!("No products found for '{keyword}'")))?;
        info!(
            "Top product: {} (demand {})",
            product.title, product.demand_score
        );

        let matched = api.match_product(&MatchRequest::for_product(product)).await?;
        let supplier = matched.cheapest();
        match supplier {
            Some(s) => info!(
                "Cheapest supplier: {} at {:.2} (retail {:.2})",
                s.source, s.unit_cost, s.suggested_retail
            ),
            None => warn!("No supplier matches for '{}'", product.title),
        }

        let request = build_generate_request(
            &product.title,
            audience,
            tone,
            supplier.map(|s| s.unit_cost),
            user_id,
        );
        let generated = api.generate(&request).await?;
        let page = GeneratedPage::new(generated, supplier, Some(product.image.as_str()));

        let file = api.export(&ExportRequest::from_page(&page)).await?;
        let path = save_export(&file, output).await?;

        let mut summary = export_summary(&file, &path);
        summary["product"] = json!(product.title);
        summary["supplier"] = json!(supplier);
        summary["seo_title"] = json!(page.generated.seo_title);
        self.output(&summary);
        Ok(())
    }

    /// Output a message
    fn output<T: Serialize + ?Sized>(&self, msg: &T) {
        let rendered = match self.cli.format {
            OutputFormat::Json => serde_json::to_string(msg),
            OutputFormat::Pretty => serde_json::to_string_pretty(msg),
        };
        println!("{}", rendered.unwrap_or_default());
    }
}

fn build_generate_request(
    name: &str,
    audience: &str,
    tone: Tone,
    supplier_price: Option<f64>,
    user_id: Option<&str>,
) -> GenerateRequest {
    let mut request = GenerateRequest::new(name).audience(audience).tone(tone);
    if let Some(price) = supplier_price {
        request = request.supplier_price(price);
    }
    if let Some(id) = user_id {
        request = request.user_id(id);
    }
    request
}

/// Where an export lands: a directory gets the server-chosen filename
pub fn export_path(file: &ExportFile, output: Option<&Path>) -> PathBuf {
    match output {
        Some(path) if path.is_dir() => path.join(&file.filename),
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(&file.filename),
    }
}

/// Write the session into a settings file, keeping what it already holds
async fn save_session(path: &Path, settings: &ClientSettings, session: &Session) -> Result<()> {
    let mut file_settings = if tokio::fs::try_exists(path).await.unwrap_or(false) {
        ClientSettings::from_file(path)?
    } else {
        ClientSettings::default()
    };

    let auth = &mut file_settings.auth;
    if auth.url.is_none() {
        auth.url.clone_from(&settings.auth.url);
    }
    if auth.anon_key.is_none() {
        auth.anon_key.clone_from(&settings.auth.anon_key);
    }
    auth.access_token = Some(session.access_token.clone());
    if let Some(refresh) = &session.refresh_token {
        auth.refresh_token = Some(refresh.clone());
    }

    let yaml = serde_yaml::to_string(&file_settings)?;
    tokio::fs::write(path, yaml)
        .await
        .with_context(|| format!("Cannot save session to {}", path.display()))
}

async fn save_export(file: &ExportFile, output: Option<&Path>) -> Result<PathBuf> {
    let path = export_path(file, output);
    tokio::fs::write(&path, &file.bytes)
        .await
        .with_context(|| format!("Cannot write export to {}", path.display()))?;
    info!("Wrote {} bytes to {}", file.bytes.len(), path.display());
    Ok(path)
}

fn export_summary(file: &ExportFile, path: &Path) -> Value {
    json!({
        "filename": file.filename,
        "path": path.display().to_string(),
        "bytes": file.bytes.len(),
        "content_type": file.content_type,
    })
}
