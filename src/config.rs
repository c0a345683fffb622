use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the Papermind server.
///
/// All upstream credentials are validated once at process start; a missing
/// value aborts startup instead of failing per-request.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Base URL of the Supabase project hosting blob storage and metadata.
    pub supabase_url: String,
    /// Supabase service key used for storage and PostgREST requests.
    pub supabase_key: String,
    /// Storage bucket holding uploaded PDF documents.
    pub storage_bucket: String,
    /// Data-plane host of the Pinecone index storing embeddings.
    pub pinecone_host: String,
    /// API key required to access the Pinecone index.
    pub pinecone_api_key: String,
    /// API key for the Gemini embedding and generation endpoints.
    pub google_api_key: String,
    /// Base URL of the Gemini REST API.
    pub gemini_base_url: String,
    /// Embedding model identifier.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Generation model identifier.
    pub generation_model: String,
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Overlap carried between adjacent chunks, in characters.
    pub chunk_overlap: usize,
    /// Maximum number of texts sent to the embedding endpoint per request.
    pub embed_batch_size: usize,
    /// Number of chunks retrieved per question.
    pub search_top_k: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            supabase_url: load_env("SUPABASE_URL")?,
            supabase_key: load_env("SUPABASE_KEY")?,
            storage_bucket: load_env_or("STORAGE_BUCKET", "papermind-pdf"),
            pinecone_host: load_env("PINECONE_HOST")?,
            pinecone_api_key: load_env("PINECONE_API_KEY")?,
            google_api_key: load_env("GOOGLE_API_KEY")?,
            gemini_base_url: load_env_or(
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com/v1beta",
            ),
            embedding_model: load_env_or("EMBEDDING_MODEL", "text-embedding-004"),
            embedding_dimension: load_env("EMBEDDING_DIMENSION")?
                .parse()
                .map_err(|_| ConfigError::InvalidValue("EMBEDDING_DIMENSION".to_string()))?,
            generation_model: load_env_or("GENERATION_MODEL", "gemini-2.0-flash"),
            chunk_size: parse_env_or("CHUNK_SIZE", 600)?,
            chunk_overlap: parse_env_or("CHUNK_OVERLAP", 100)?,
            embed_batch_size: parse_env_or("EMBED_BATCH_SIZE", 100)?,
            search_top_k: parse_env_or("SEARCH_TOP_K", 3)?,
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_env_or(key: &str, default: &str) -> String {
    load_env_optional(key).unwrap_or_else(|| default.to_string())
}

fn parse_env_or(key: &str, default: usize) -> Result<usize, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
        .map(|value| value.unwrap_or(default))
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        supabase_url = %config.supabase_url,
        bucket = %config.storage_bucket,
        pinecone_host = %config.pinecone_host,
        embedding_model = %config.embedding_model,
        embedding_dimension = config.embedding_dimension,
        generation_model = %config.generation_model,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
