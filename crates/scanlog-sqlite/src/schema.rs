pub const MIG_0001_INIT: &str = r#"
BEGIN;

CREATE TABLE IF NOT EXISTS scans (
  id              INTEGER PRIMARY KEY AUTOINCREMENT,
  type            TEXT,
  input           TEXT,
  result          TEXT,
  confidence      REAL,
  timestamp       TEXT
);

CREATE INDEX IF NOT EXISTS idx_scans_type ON scans(type);
CREATE INDEX IF NOT EXISTS idx_scans_timestamp ON scans(timestamp);

COMMIT;
"#
;
