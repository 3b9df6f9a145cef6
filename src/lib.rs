//! # ai-lib-tools
//!
//! 面向 AI-Protocol 智能体的工具调用运行时：声明式 REST 工具、多厂商工具调用归一化与有界智能体循环。
//!
//! Tool-invocation runtime for AI-Protocol agents. A model backend decides
//! when to call declaratively described REST operations; this crate compiles
//! those calls into HTTP requests, executes them and drives the bounded
//! model⇄tool loop until the model answers.
//!
//! ## Core Philosophy
//!
//! - **Declarative tools**: remote operations are data ([`ToolDescriptor`]), not code
//! - **Provider-agnostic**: one driver per backend dialect (OpenAI, Anthropic, Bedrock Converse)
//! - **Failures are answers**: tool errors become tool results the model can react to
//! - **No silent retries**: every remote call happens at most once per request
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ai_lib_tools::agent::{AgentLoop, AuthContext, LoopConfig, ToolExecutor};
//! use ai_lib_tools::credentials::{EnvSecretStore, TenantSecrets};
//! use ai_lib_tools::drivers::{BackendKind, InferenceOptions};
//! use ai_lib_tools::integration::Integration;
//! use ai_lib_tools::registry::ToolRegistry;
//! use ai_lib_tools::transport::{HttpModelBackend, HttpTransport};
//! use ai_lib_tools::EngineConfig;
//!
//! #[tokio::main]
//! async fn main() -> ai_lib_tools::Result<()> {
//!     let config = EngineConfig::from_env();
//!     let registry = ToolRegistry::from_yaml_str(&std::fs::read_to_string("tools/jira.yaml")?)?;
//!
//!     let executor = ToolExecutor::new(
//!         Arc::new(registry),
//!         Integration::jira(),
//!         Arc::new(HttpTransport::new(&config)?),
//!     )
//!     .with_secrets(TenantSecrets::from_config(Arc::new(EnvSecretStore::default()), &config))
//!     .with_tool_timeout(config.tool_timeout());
//!
//!     let backend = Arc::new(HttpModelBackend::new(BackendKind::Anthropic, &config)?);
//!     let agent = AgentLoop::new(
//!         backend,
//!         executor,
//!         LoopConfig::from_engine(&config, InferenceOptions::new("claude-3-5-sonnet-latest")),
//!     );
//!
//!     let ctx = AuthContext::new("T0123", "U0456", "ann@acme.io");
//!     match agent.run("You manage Jira issues.", &[], "What is CORE-1 about?", &ctx).await {
//!         Ok(outcome) => println!("{}", outcome.final_text),
//!         Err(failure) => eprintln!("{} ({} model calls)", failure, failure.usage_log.len()),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Tool descriptors, invocations, results and conversation turns |
//! | [`registry`] | Validated descriptor sets and their YAML/JSON loader |
//! | [`compiler`] | Descriptor + model input → concrete HTTP request |
//! | [`drivers`] | Backend-specific tool-call dialects |
//! | [`transport`] | HTTP execution of tool requests and model calls |
//! | [`credentials`] | Delegated token resolution and tenant secrets, TTL-cached |
//! | [`integration`] | Base URL, auth strategy and apology text per integration |
//! | [`agent`] | The bounded agentic loop |

pub mod agent;
pub mod compiler;
pub mod config;
pub mod credentials;
pub mod drivers;
pub mod integration;
pub mod logging;
pub mod registry;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use agent::{run_agent_loop, AgentLoop, AuthContext, Completion, LoopConfig, LoopOutcome};
pub use compiler::{compile, CompiledRequest, RequestTarget};
pub use config::EngineConfig;
pub use drivers::{create_driver, BackendKind, ProviderDriver, UsageRecord};
pub use registry::ToolRegistry;
pub use types::{ToolDescriptor, ToolInvocation, ToolResult, Turn};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
