use neo4rs::{ConfigBuilder, Graph};

use cybench_script::{UnitOfWork, Value};

use crate::client::{ClientError, CypherClient, ErrorCategory};

/// Whether to require, forbid, or leave TLS to the caller's URI scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionMode {
    Auto,
    On,
    Off,
}

/// Bolt-backed Cypher client. The driver pools connections internally, so a
/// single clone-free instance is shared by all workers.
pub struct Neo4jClient {
    graph: Graph,
}

impl Neo4jClient {
    pub async fn connect(
        address: &str,
        user: &str,
        password: &str,
        encryption: EncryptionMode,
    ) -> Result<Self, ClientError> {
        let uri = apply_encryption(address, encryption);
        let config = ConfigBuilder::default()
            .uri(uri)
            .user(user)
            .password(password)
            .build()
            .map_err(classify)?;
        let graph = Graph::connect(config).await.map_err(classify)?;
        Ok(Self { graph })
    }
}

impl CypherClient for Neo4jClient {
    async fn execute(&self, database: &str, unit: &UnitOfWork) -> Result<(), ClientError> {
        let mut txn = if database.is_empty() {
            self.graph.start_txn().await.map_err(classify)?
        } else {
            self.graph.start_txn_on(database).await.map_err(classify)?
        };

        for statement in &unit.statements {
            let mut query = neo4rs::query(&statement.query);
            for (name, value) in &statement.params {
                query = match value {
                    Value::Int(v) => query.param(name, *v),
                    Value::Float(v) => query.param(name, *v),
                    Value::String(v) => query.param(name, v.as_str()),
                };
            }
            if let Err(err) = txn.run(query).await {
                let classified = classify(err);
                let _ = txn.rollback().await;
                return Err(classified);
            }
        }

        txn.commit().await.map_err(classify)
    }
}

/// Maps a driver error onto a failure category by inspecting the server
/// error code (`Neo.ClientError.Statement.SyntaxError` and friends);
/// anything unrecognized is treated as a connection-level failure.
fn classify(err: neo4rs::Error) -> ClientError {
    classify_message(err.to_string())
}

fn classify_message(text: String) -> ClientError {
    let category = if text.contains("Security.Unauthorized")
        || text.contains("Security.CredentialsExpired")
        || text.contains("authentication")
    {
        ErrorCategory::Auth
    } else if text.contains("SyntaxError") || text.contains("InvalidSyntax") {
        ErrorCategory::CypherSyntax
    } else if text.contains("TransientError")
        || text.contains("ServiceUnavailable")
        || text.contains("NotALeader")
        || text.contains("LeaderSwitch")
        || text.contains("DeadlockDetected")
    {
        ErrorCategory::Transient
    } else if text.contains("ConstraintValidation") || text.contains("Schema.Constraint") {
        ErrorCategory::Constraint
    } else {
        ErrorCategory::Io
    };
    ClientError::new(category, text)
}

/// `on` forces the `+s` scheme variant, `off` strips it, `auto` trusts the
/// address as given.
fn apply_encryption(address: &str, mode: EncryptionMode) -> String {
    let (scheme, rest) = match address.split_once("://") {
        Some((scheme, rest)) => (scheme, rest),
        None => ("neo4j", address),
    };
    let base = scheme
        .strip_suffix("+s")
        .or_else(|| scheme.strip_suffix("+ssc"))
        .unwrap_or(scheme);
    match mode {
        EncryptionMode::Auto => format!("{scheme}://{rest}"),
        EncryptionMode::On => format!("{base}+s://{rest}"),
        EncryptionMode::Off => format!("{base}://{rest}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encryption_mode_rewrites_the_scheme() {
        let addr = "neo4j://localhost:7687";
        assert_eq!(apply_encryption(addr, EncryptionMode::Auto), addr);
        assert_eq!(
            apply_encryption(addr, EncryptionMode::On),
            "neo4j+s://localhost:7687"
        );
        assert_eq!(
            apply_encryption("neo4j+s://db:7687", EncryptionMode::Off),
            "neo4j://db:7687"
        );
        assert_eq!(
            apply_encryption("bolt+ssc://db:7687", EncryptionMode::On),
            "bolt+s://db:7687"
        );
        assert_eq!(
            apply_encryption("localhost:7687", EncryptionMode::Auto),
            "neo4j://localhost:7687"
        );
    }

    #[test]
    fn server_codes_map_to_categories() {
        let cases = [
            ("Neo.ClientError.Security.Unauthorized", ErrorCategory::Auth),
            (
                "Neo.ClientError.Statement.SyntaxError",
                ErrorCategory::CypherSyntax,
            ),
            (
                "Neo.TransientError.Transaction.DeadlockDetected",
                ErrorCategory::Transient,
            ),
            (
                "Neo.ClientError.Cluster.NotALeader",
                ErrorCategory::Transient,
            ),
            (
                "Neo.ClientError.Schema.ConstraintValidationFailed",
                ErrorCategory::Constraint,
            ),
            ("connection reset by peer", ErrorCategory::Io),
        ];
        for (code, expected) in cases {
            let got = classify_message(code.to_string());
            assert_eq!(got.category, expected, "{code}");
        }
    }
}
