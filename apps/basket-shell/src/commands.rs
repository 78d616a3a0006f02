//! # Shell Commands
//!
//! Parses one input line and runs it against the cart.
//!
//! ## Command Set
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add <id> <price> <image_url> <title...>   add one unit (insert at 1)  │
//! │  inc <id>                                  add one unit of known item  │
//! │  dec <id>                                  remove one unit, floor 0    │
//! │  list                                      items + totals              │
//! │  summary                                   totals only                 │
//! │  status                                    snapshot writer progress    │
//! │  flush                                     wait for the latest write   │
//! │  help                                      this text                   │
//! │  quit                                      drain writes and exit       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use basket_core::{Cart, CartSummary, LineItem, NewLineItem};
use basket_state::{CartContext, PersistenceStatus};
use serde::Serialize;
use tracing::debug;

use crate::error::ShellError;

pub const HELP: &str = "\
commands:
  add <id> <price> <image_url> <title...>
  inc <id>
  dec <id>
  list
  summary
  status
  flush
  help
  quit";

// =============================================================================
// Parsing
// =============================================================================

/// A parsed shell command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Add(NewLineItem),
    Increment(String),
    Decrement(String),
    List,
    Summary,
    Status,
    Flush,
    Help,
    Quit,
}

/// Parses one input line. Blank lines and `#` comments yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>, ShellError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default().to_lowercase();

    let command = match verb.as_str() {
        "add" => {
            let id = required(words.next(), "add: missing <id>")?;
            let price = required(words.next(), "add: missing <price>")?;
            let price: f64 = price
                .parse()
                .map_err(|_| ShellError::usage(format!("add: '{}' is not a price", price)))?;
            let image_url = required(words.next(), "add: missing <image_url>")?;
            let title = words.collect::<Vec<_>>().join(" ");
            if title.is_empty() {
                return Err(ShellError::usage("add: missing <title>"));
            }
            Command::Add(NewLineItem::new(id, title, image_url, price))
        }
        "inc" | "increment" => {
            Command::Increment(required(words.next(), "inc: missing <id>")?.to_string())
        }
        "dec" | "decrement" => {
            Command::Decrement(required(words.next(), "dec: missing <id>")?.to_string())
        }
        "list" | "ls" => Command::List,
        "summary" => Command::Summary,
        "status" => Command::Status,
        "flush" => Command::Flush,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => {
            return Err(ShellError::usage(format!(
                "unknown command '{}', try 'help'",
                other
            )))
        }
    };

    Ok(Some(command))
}

fn required<'a>(word: Option<&'a str>, message: &str) -> Result<&'a str, ShellError> {
    word.ok_or_else(|| ShellError::usage(message))
}

// =============================================================================
// Responses
// =============================================================================

/// Cart contents plus totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub items: Vec<LineItem>,
    pub summary: CartSummary,
    pub version: u64,
}

impl CartResponse {
    fn new(cart: &Cart, version: u64) -> Self {
        CartResponse {
            items: cart.items().to_vec(),
            summary: cart.summary(),
            version,
        }
    }
}

/// The outcome of a command.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Response {
    Cart {
        changed: bool,
        cart: CartResponse,
    },
    Summary {
        summary: CartSummary,
    },
    Status {
        status: PersistenceStatus,
    },
    Flushed {
        version: u64,
    },
    Help {
        text: String,
    },
    Quit,
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Response::Cart { changed, cart } => {
                if !changed {
                    writeln!(f, "(no change)")?;
                }
                for item in &cart.items {
                    writeln!(
                        f,
                        "{:<12} x{:<4} {:>10.2}  {}",
                        item.id,
                        item.quantity,
                        item.line_total(),
                        item.title
                    )?;
                }
                write_summary(f, &cart.summary)
            }
            Response::Summary { summary } => write_summary(f, summary),
            Response::Status { status } => write!(
                f,
                "settled v{}, durable v{}, failed writes {}{}",
                status.settled_version,
                status.durable_version,
                status.failed_writes,
                status
                    .last_error
                    .as_ref()
                    .map(|e| format!(", last error: {}", e))
                    .unwrap_or_default()
            ),
            Response::Flushed { version } => write!(f, "flushed v{}", version),
            Response::Help { text } => write!(f, "{}", text),
            Response::Quit => write!(f, "bye"),
        }
    }
}

fn write_summary(f: &mut std::fmt::Formatter<'_>, summary: &CartSummary) -> std::fmt::Result {
    write!(
        f,
        "{} line(s), {} unit(s), subtotal {:.2}",
        summary.line_count, summary.total_quantity, summary.subtotal
    )
}

// =============================================================================
// Execution
// =============================================================================

/// Runs `command` against the cart behind `ctx`.
pub async fn execute(ctx: &CartContext, command: Command) -> Result<Response, ShellError> {
    debug!(?command, "Executing shell command");

    let store = ctx.cart()?;

    let response = match command {
        Command::Add(item) => {
            let changed = store.add_to_cart(item)?;
            cart_response(ctx, changed)?
        }
        Command::Increment(id) => {
            let changed = store.increment(&id);
            cart_response(ctx, changed)?
        }
        Command::Decrement(id) => {
            let changed = store.decrement(&id);
            cart_response(ctx, changed)?
        }
        Command::List => cart_response(ctx, true)?,
        Command::Summary => Response::Summary {
            summary: store.summary(),
        },
        Command::Status => Response::Status {
            status: store.persistence_status(),
        },
        Command::Flush => {
            store.flush().await?;
            Response::Flushed {
                version: store.version(),
            }
        }
        Command::Help => Response::Help {
            text: HELP.to_string(),
        },
        Command::Quit => Response::Quit,
    };

    Ok(response)
}

fn cart_response(ctx: &CartContext, changed: bool) -> Result<Response, ShellError> {
    let store = ctx.cart()?;
    Ok(Response::Cart {
        changed,
        cart: CartResponse::new(&store.items(), store.version()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use basket_db::MemoryStore;
    use basket_state::{CartConfig, CartProvider, CartStore};
    use std::sync::Arc;

    async fn provider() -> CartProvider {
        let store = CartStore::bootstrap(Arc::new(MemoryStore::new()), &CartConfig::default())
            .await
            .unwrap();
        CartProvider::new(store)
    }

    #[test]
    fn test_parse_add_with_multiword_title() {
        let command = parse("add p1 19.99 shirt.png Blue Cotton Shirt")
            .unwrap()
            .unwrap();
        assert_eq!(
            command,
            Command::Add(NewLineItem::new("p1", "Blue Cotton Shirt", "shirt.png", 19.99))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse("add p1").unwrap_err().code, ErrorCode::Usage);
        assert_eq!(parse("add p1 abc u T").unwrap_err().code, ErrorCode::Usage);
        assert_eq!(parse("frobnicate").unwrap_err().code, ErrorCode::Usage);
        assert!(parse("   ").unwrap().is_none());
        assert!(parse("# comment").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_execute_walkthrough() {
        let provider = provider().await;
        let ctx = provider.context();

        execute(&ctx, parse("add p1 20 u Shirt").unwrap().unwrap())
            .await
            .unwrap();
        execute(&ctx, Command::Increment("p1".into())).await.unwrap();

        let response = execute(&ctx, Command::Decrement("ghost".into()))
            .await
            .unwrap();
        match response {
            Response::Cart { changed, cart } => {
                assert!(!changed);
                assert_eq!(cart.items[0].quantity, 2);
                assert_eq!(cart.summary.subtotal, 40.0);
            }
            other => panic!("unexpected response: {:?}", other),
        }

        let flushed = execute(&ctx, Command::Flush).await.unwrap();
        assert!(matches!(flushed, Response::Flushed { version: 2 }));
    }

    #[tokio::test]
    async fn test_invalid_price_is_validation_error() {
        let provider = provider().await;
        let err = execute(
            &provider.context(),
            Command::Add(NewLineItem::new("p1", "Shirt", "u", -5.0)),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_detached_context_is_configuration_error() {
        let err = execute(&CartContext::detached(), Command::List)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Configuration);
        assert!(err.message.contains("CartProvider"));
    }

    #[test]
    fn test_response_json_is_tagged() {
        let json = serde_json::to_value(Response::Flushed { version: 3 }).unwrap();
        assert_eq!(json["kind"], "flushed");
        assert_eq!(json["version"], 3);
    }
}
