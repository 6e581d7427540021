use crate::models::{ScanRow, SELECT_COLUMNS};
use crate::Db;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use shield_core::{Result, ScanFilter, ScanRecord};

impl Db {
    #[cfg(test)]
    pub(crate) fn table_exists(&self, name: &str) -> Result<bool> {
        self.with_inner(|inner| {
            let cnt: i64 = inner.conn.query_row(
                "SELECT COUNT(1) FROM sqlite_master WHERE type='table' AND name=?",
                [name],
                |r| r.get(0),
            )?;
            Ok::<_, rusqlite::Error>(cnt > 0)
        })
    }

    #[cfg(test)]
    pub(crate) fn count(&self) -> Result<i64> {
        self.with_inner(|inner| inner.conn.query_row("SELECT COUNT(1) FROM scans", [], |r| r.get(0)))
    }

    /// Most recent first.
    pub fn recent(&self, limit: usize) -> Result<Vec<ScanRecord>> {
        self.filtered(&ScanFilter { limit: Some(limit), ..Default::default() })
    }

    /// Every row, most recent first.
    pub fn all(&self) -> Result<Vec<ScanRecord>> {
        self.filtered(&ScanFilter::default())
    }

    pub fn filtered(&self, filter: &ScanFilter) -> Result<Vec<ScanRecord>> {
        let mut sql = String::from(SELECT_COLUMNS);
        let mut args: Vec<Value> = Vec::new();
        let mut clauses: Vec<&str> = Vec::new();
        if let Some(kind) = filter.kind {
            clauses.push("type = ?");
            args.push(Value::Text(kind.as_str().to_string()));
        }
        if let Some(needle) = filter.result_contains.as_deref().filter(|s| !s.is_empty()) {
            clauses.push("instr(lower(result), lower(?)) > 0");
            args.push(Value::Text(needle.to_string()));
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        // id order is insertion order; timestamps can tie
        sql.push_str(" ORDER BY id DESC LIMIT ?");
        args.push(Value::Integer(filter.limit.map(|n| n.min(i64::MAX as usize) as i64).unwrap_or(-1)));
        self.with_inner(|inner| select(&inner.conn, &sql, args))
    }
}

fn select(conn: &Connection, sql: &str, args: Vec<Value>) -> rusqlite::Result<Vec<ScanRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params_from_iter(args), ScanRow::from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?.into_record());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use crate::Db;
    use shield_core::{NewScan, ScanFilter, ScanKind, ScanLog};

    fn seeded() -> Db {
        let db = Db::open_in_memory().unwrap();
        for (k, input, res) in [
            (ScanKind::Url, "https://google.com", "Safe"),
            (ScanKind::Url, "http://malicious-update.xyz", "Malicious"),
            (ScanKind::Text, "Everyone hates you.", "Cyberbullying: Harassment"),
            (ScanKind::IpReputation, "8.8.8.8", "Clean IP"),
        ] {
            db.append(NewScan::new(k, input, res, 0.5)).unwrap();
        }
        db
    }

    #[test]
    fn recent_is_newest_first_and_limited() {
        let db = seeded();
        let recent = db.fetch_recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].input, "8.8.8.8");
        assert!(recent[0].id > recent[1].id);
        assert_eq!(db.fetch_recent(0).unwrap().len(), 0);
        assert_eq!(db.fetch_all().unwrap().len(), 4);
        assert_eq!(db.count().unwrap(), 4);
    }

    #[test]
    fn latest_append_leads_recent() {
        let db = seeded();
        let rec = db.append(NewScan::new(ScanKind::Profile, "{}", "Likely Genuine", 0.0)).unwrap();
        assert_eq!(db.fetch_recent(1).unwrap()[0], rec);
    }

    #[test]
    fn filters_by_kind_and_result() {
        let db = seeded();
        let urls = db.fetch_filtered(&ScanFilter { kind: Some(ScanKind::Url), ..Default::default() }).unwrap();
        assert_eq!(urls.len(), 2);
        let bad = db
            .fetch_filtered(&ScanFilter { result_contains: Some("MALICIOUS".into()), ..Default::default() })
            .unwrap();
        assert_eq!(bad.len(), 1);
        assert_eq!(bad[0].input, "http://malicious-update.xyz");
        let none = db
            .fetch_filtered(&ScanFilter { kind: Some(ScanKind::Text), result_contains: Some("safe".into()), limit: Some(5) })
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn legacy_types_are_kept_and_counted() {
        let db = seeded();
        db.with_inner(|inner| {
            inner.conn.execute(
                "INSERT INTO scans (type, input, result, confidence, timestamp) VALUES ('PortScan','10.0.0.5','PortScan from 10.0.0.5',NULL,'2025-01-01 10:00:00')",
                [],
            )
        })
        .unwrap();
        assert_eq!(db.count().unwrap(), 5);
        let all = db.fetch_all().unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].kind, "PortScan");
        assert_eq!(all[0].scan_kind(), None);
        assert_eq!(all[0].confidence, 0.0);
        let stats = shield_core::summarize(&all);
        assert_eq!(stats.total, 5);
        assert_eq!(stats.by_kind.get("PortScan"), Some(&1));
        let urls = db.fetch_filtered(&ScanFilter { kind: Some(ScanKind::Url), ..Default::default() }).unwrap();
        assert_eq!(urls.len(), 2);
    }
}
