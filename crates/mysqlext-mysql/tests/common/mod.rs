//! In-memory server that answers `HANDLER` statements.
//!
//! Tables hold `(id, score)` rows with two indexes: `PRIMARY` on `id` and
//! `score_id` on `(score, id)`. Each open handle keeps its own cursor, the
//! way a MySQL connection does.

#![allow(dead_code)]

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use mysqlext_core::{
    ColumnInfo, Connection, Error, QueryError, QueryErrorKind, Result, Row, Value,
};
use regex::Regex;

fn open_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^HANDLER `([^`]+)` OPEN AS `([^`]+)`$").unwrap())
}

fn close_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^HANDLER `([^`]+)` CLOSE$").unwrap())
}

fn read_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?x)
            ^HANDLER\ `(?P<handle>[^`]+)`\ READ\ `(?P<index>[^`]+)`
            \ (?:(?P<mode>FIRST|LAST|NEXT|PREV)|(?P<op><=|>=|=|<|>)\ \((?P<ph>\?(?:,\?)*)\))
            (?:\ WHERE\ (?P<filter>.+?))?
            (?:\ LIMIT\ (?P<limit>\d+))?$",
        )
        .unwrap()
    })
}

fn condition_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^`?(id|score)`?\s*(<=|>=|!=|=|<|>)\s*\?$").unwrap())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record {
    pub id: i64,
    pub score: i64,
}

#[derive(Debug)]
struct Cursor {
    table: String,
    index: String,
    /// Position of the last visited entry; `None` before the first read.
    pos: Option<isize>,
}

#[derive(Debug, Clone, Copy)]
enum Comparison {
    Lt,
    Lte,
    Eq,
    Ne,
    Gte,
    Gt,
}

impl Comparison {
    fn parse(op: &str) -> Self {
        match op {
            "<" => Comparison::Lt,
            "<=" => Comparison::Lte,
            "=" => Comparison::Eq,
            "!=" => Comparison::Ne,
            ">=" => Comparison::Gte,
            _ => Comparison::Gt,
        }
    }

    fn holds(self, ord: Ordering) -> bool {
        match self {
            Comparison::Lt => ord == Ordering::Less,
            Comparison::Lte => ord != Ordering::Greater,
            Comparison::Eq => ord == Ordering::Equal,
            Comparison::Ne => ord != Ordering::Equal,
            Comparison::Gte => ord != Ordering::Less,
            Comparison::Gt => ord == Ordering::Greater,
        }
    }
}

/// A conjunction of `column op ?` conditions.
struct Filter {
    conditions: Vec<(String, Comparison, i64)>,
}

impl Filter {
    fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().all(|(column, cmp, value)| {
            let actual = if column == "id" { record.id } else { record.score };
            cmp.holds(actual.cmp(value))
        })
    }
}

#[derive(Debug, Default)]
pub struct FakeServer {
    tables: RefCell<HashMap<String, Vec<Record>>>,
    handles: RefCell<HashMap<String, Cursor>>,
    statements: RefCell<Vec<(String, Vec<Value>)>>,
    fail_on: RefCell<Option<String>>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A server with `table` holding ids `1..=rows`, each scored `id % 7`.
    pub fn with_rows(table: &str, rows: i64) -> Self {
        let server = Self::new();
        server.create_table(
            table,
            (1..=rows).map(|id| Record { id, score: id % 7 }).collect(),
        );
        server
    }

    pub fn create_table(&self, name: &str, records: Vec<Record>) {
        self.tables.borrow_mut().insert(name.to_string(), records);
    }

    /// Fail every statement containing `fragment`.
    pub fn fail_on(&self, fragment: &str) {
        *self.fail_on.borrow_mut() = Some(fragment.to_string());
    }

    pub fn stop_failing(&self) {
        *self.fail_on.borrow_mut() = None;
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements
            .borrow()
            .iter()
            .map(|(sql, _)| sql.clone())
            .collect()
    }

    pub fn last_params(&self) -> Vec<Value> {
        self.statements
            .borrow()
            .last()
            .map(|(_, params)| params.clone())
            .unwrap_or_default()
    }

    pub fn statement_count(&self) -> usize {
        self.statements.borrow().len()
    }

    pub fn open_handles(&self) -> Vec<String> {
        let mut names: Vec<_> = self.handles.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    fn run(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.statements
            .borrow_mut()
            .push((sql.to_string(), params.to_vec()));

        if let Some(fragment) = self.fail_on.borrow().as_deref() {
            if sql.contains(fragment) {
                return Err(server_error(sql, "injected failure"));
            }
        }

        if let Some(caps) = open_re().captures(sql) {
            let table = caps[1].to_string();
            if !self.tables.borrow().contains_key(&table) {
                return Err(server_error(sql, "Table doesn't exist"));
            }
            let mut handles = self.handles.borrow_mut();
            if handles.contains_key(&caps[2]) {
                return Err(server_error(sql, "Not unique table/alias"));
            }
            handles.insert(
                caps[2].to_string(),
                Cursor {
                    table,
                    index: "PRIMARY".to_string(),
                    pos: None,
                },
            );
            return Ok(Vec::new());
        }

        if let Some(caps) = close_re().captures(sql) {
            return match self.handles.borrow_mut().remove(&caps[1]) {
                Some(_) => Ok(Vec::new()),
                None => Err(server_error(sql, "Unknown table in HANDLER")),
            };
        }

        if let Some(caps) = read_re().captures(sql) {
            return self.read(sql, &caps, params);
        }

        Err(server_error(sql, "You have an error in your SQL syntax"))
    }

    fn read(&self, sql: &str, caps: &regex::Captures<'_>, params: &[Value]) -> Result<Vec<Row>> {
        let mut handles = self.handles.borrow_mut();
        let Some(cursor) = handles.get_mut(&caps["handle"]) else {
            return Err(server_error(sql, "Unknown table in HANDLER"));
        };
        let index = caps["index"].to_string();
        if index != "PRIMARY" && index != "score_id" {
            return Err(server_error(sql, "Key does not exist"));
        }
        if cursor.index != index {
            cursor.index = index.clone();
            cursor.pos = None;
        }

        let mut params = params.iter().map(|v| v.as_i64().unwrap_or_default());
        let key: Vec<i64> = match caps.name("ph") {
            Some(ph) => (0..ph.as_str().split(',').count())
                .map(|_| params.next().unwrap_or_default())
                .collect(),
            None => Vec::new(),
        };
        let filter = Filter {
            conditions: match caps.name("filter") {
                Some(text) => text
                    .as_str()
                    .split(" AND ")
                    .map(|cond| {
                        let c = condition_re()
                            .captures(cond.trim())
                            .ok_or_else(|| server_error(sql, "Unsupported WHERE"))?;
                        Ok((
                            c[1].to_string(),
                            Comparison::parse(&c[2]),
                            params.next().unwrap_or_default(),
                        ))
                    })
                    .collect::<Result<Vec<_>>>()?,
                None => Vec::new(),
            },
        };
        let limit: usize = caps
            .name("limit")
            .map_or(1, |m| m.as_str().parse().unwrap_or(1));

        let tables = self.tables.borrow();
        let records = &tables[&cursor.table];
        let mut entries: Vec<(Vec<i64>, Record)> = records
            .iter()
            .map(|r| {
                let key = if index == "PRIMARY" {
                    vec![r.id]
                } else {
                    vec![r.score, r.id]
                };
                (key, *r)
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let len = entries.len() as isize;

        let prefix_cmp = |i: isize| -> Ordering {
            let entry = &entries[i as usize].0;
            entry[..key.len().min(entry.len())].cmp(&key[..])
        };

        // (start, forward, only_equal)
        let (start, forward, only_equal) = if let Some(mode) = caps.name("mode") {
            match (mode.as_str(), cursor.pos) {
                ("FIRST", _) | ("NEXT", None) => (0, true, false),
                ("LAST", _) | ("PREV", None) => (len - 1, false, false),
                ("NEXT", Some(pos)) => (pos + 1, true, false),
                (_, Some(pos)) => (pos - 1, false, false),
                (_, None) => unreachable!("mode regex only admits FIRST|LAST|NEXT|PREV"),
            }
        } else {
            let cmp = Comparison::parse(&caps["op"]);
            match cmp {
                Comparison::Eq => (
                    (0..len).find(|&i| prefix_cmp(i) == Ordering::Equal).unwrap_or(len),
                    true,
                    true,
                ),
                Comparison::Gte | Comparison::Gt => (
                    (0..len).find(|&i| cmp.holds(prefix_cmp(i))).unwrap_or(len),
                    true,
                    false,
                ),
                _ => (
                    (0..len).rev().find(|&i| cmp.holds(prefix_cmp(i))).unwrap_or(-1),
                    false,
                    false,
                ),
            }
        };

        let columns = Arc::new(ColumnInfo::new(vec!["id".into(), "score".into()]));
        let mut rows = Vec::new();
        let mut i = start;
        while (0..len).contains(&i) && rows.len() < limit {
            cursor.pos = Some(i);
            if only_equal && prefix_cmp(i) != Ordering::Equal {
                break;
            }
            let record = entries[i as usize].1;
            if filter.matches(&record) {
                rows.push(Row::with_columns(
                    Arc::clone(&columns),
                    vec![Value::BigInt(record.id), Value::BigInt(record.score)],
                ));
            }
            i += if forward { 1 } else { -1 };
        }
        if !(0..len).contains(&i) {
            cursor.pos = Some(if forward { len } else { -1 });
        }

        Ok(rows)
    }
}

fn server_error(sql: &str, message: &str) -> Error {
    Error::Query(QueryError {
        kind: QueryErrorKind::Database,
        sql: Some(sql.to_string()),
        sqlstate: Some("HY000".to_string()),
        message: message.to_string(),
        source: None,
    })
}

impl Connection for FakeServer {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.run(sql, params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.run(sql, params).map(|rows| rows.len() as u64)
    }
}

/// Ids of `rows`, in order.
pub fn ids(rows: &[Row]) -> Vec<i64> {
    rows.iter()
        .map(|row| row.get_named::<i64>("id").unwrap())
        .collect()
}
