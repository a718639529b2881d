use std::collections::BTreeMap;

use cybench_core::{ClientError, CypherClient};
use cybench_script::{Statement, UnitOfWork, Value};

/// TPC-B-style read/write transaction over the builtin dataset. The first
/// query's trailing space and embedded newline are part of the script and
/// preserved verbatim in the statement text.
const TPCB_LIKE: &str = concat!(
    "\\set aid random(1, 100000 * :scale)\n",
    "\\set bid random(1, 1 * :scale)\n",
    "\\set tid random(1, 10 * :scale)\n",
    "\\set delta random(-5000, 5000)\n",
    "MATCH (account:Account {aid:$aid}) \n",
    "SET account.balance = account.balance + $delta;\n",
    "MATCH (account:Account {aid:$aid}) RETURN account.balance;\n",
    "MATCH (teller:Tellers {tid: $tid}) SET teller.balance = teller.balance + $delta;\n",
    "MATCH (branch:Branch {bid: $bid}) SET branch.balance = branch.balance + $delta;\n",
    "CREATE (:History { tid: $tid, bid: $bid, aid: $aid, delta: $delta, mtime: timestamp() });\n",
);

/// Single-read workload over the same dataset as `tpcb-like`.
const MATCH_ONLY: &str = concat!(
    "\\set aid random(1, 100000 * :scale)\n",
    "MATCH (account:Account {aid:$aid}) RETURN account.balance;\n",
);

pub(crate) struct Builtin {
    pub(crate) name: &'static str,
    pub(crate) source: &'static str,
    pub(crate) readonly: bool,
}

pub(crate) fn builtin(path: &str) -> Option<Builtin> {
    match path {
        // `tpcp-like` is a misspelling that shipped in an old release and
        // stuck in scripts; keep accepting it.
        "builtin:tpcb-like" | "builtin:tpcp-like" => Some(Builtin {
            name: "builtin:tpcb-like",
            source: TPCB_LIKE,
            readonly: false,
        }),
        "builtin:match-only" => Some(Builtin {
            name: "builtin:match-only",
            source: MATCH_ONLY,
            readonly: true,
        }),
        _ => None,
    }
}

const BRANCHES_PER_SCALE: i64 = 1;
const TELLERS_PER_SCALE: i64 = 10;
const ACCOUNTS_PER_SCALE: i64 = 100_000;
const INIT_BATCH: i64 = 10_000;

/// Creates the dataset both builtins run against: per unit of scale, one
/// branch, ten tellers, and one hundred thousand zero-balance accounts,
/// with uniqueness constraints on their ids. Idempotent via MERGE.
pub(crate) async fn init_dataset<C: CypherClient>(
    client: &C,
    database: &str,
    scale: i64,
) -> Result<(), ClientError> {
    let constraints = [
        "CREATE CONSTRAINT branch_bid IF NOT EXISTS FOR (b:Branch) REQUIRE b.bid IS UNIQUE",
        "CREATE CONSTRAINT teller_tid IF NOT EXISTS FOR (t:Tellers) REQUIRE t.tid IS UNIQUE",
        "CREATE CONSTRAINT account_aid IF NOT EXISTS FOR (a:Account) REQUIRE a.aid IS UNIQUE",
    ];
    for ddl in constraints {
        run_single(client, database, ddl, BTreeMap::new()).await?;
    }

    run_single(
        client,
        database,
        "UNWIND range(1, $branches) AS bid MERGE (b:Branch {bid: bid}) ON CREATE SET b.balance = 0",
        BTreeMap::from([("branches".to_string(), Value::Int(BRANCHES_PER_SCALE * scale))]),
    )
    .await?;

    run_single(
        client,
        database,
        "UNWIND range(1, $tellers) AS tid MERGE (t:Tellers {tid: tid}) ON CREATE SET t.balance = 0",
        BTreeMap::from([("tellers".to_string(), Value::Int(TELLERS_PER_SCALE * scale))]),
    )
    .await?;

    // Accounts are created in batches to keep transactions bounded.
    let accounts = ACCOUNTS_PER_SCALE * scale;
    let mut lo = 1;
    while lo <= accounts {
        let hi = (lo + INIT_BATCH - 1).min(accounts);
        run_single(
            client,
            database,
            "UNWIND range($lo, $hi) AS aid MERGE (a:Account {aid: aid}) ON CREATE SET a.balance = 0",
            BTreeMap::from([
                ("lo".to_string(), Value::Int(lo)),
                ("hi".to_string(), Value::Int(hi)),
            ]),
        )
        .await?;
        lo = hi + 1;
    }

    Ok(())
}

async fn run_single<C: CypherClient>(
    client: &C,
    database: &str,
    query: &str,
    params: BTreeMap<String, Value>,
) -> Result<(), ClientError> {
    let unit = UnitOfWork {
        readonly: false,
        statements: vec![Statement {
            query: query.to_string(),
            params,
        }],
    };
    client.execute(database, &unit).await
}
