//! JSON persistence for databases.
//!
//! Thresholds are stored as calibrated and never re-derived on load, so a
//! database saved without its negatives still searches identically.

use crate::database::Database;
use crate::trace::trace_span;
use crate::util::{StacheError, StacheResult};
use std::path::Path;

fn serialize_error(err: serde_json::Error) -> StacheError {
    StacheError::Serialize {
        reason: err.to_string(),
    }
}

impl Database {
    /// Encodes the database as JSON.
    pub fn to_json(&self) -> StacheResult<String> {
        serde_json::to_string(self).map_err(serialize_error)
    }

    /// Decodes a database from JSON, validating ids and mirror links.
    pub fn from_json(json: &str) -> StacheResult<Database> {
        serde_json::from_str(json).map_err(serialize_error)
    }

    /// Writes the database to `path` as JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> StacheResult<()> {
        let path = path.as_ref();
        let _span = trace_span!("save_database").entered();
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|err| StacheError::io(path, err))
    }

    /// Reads a database previously written by [`Database::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> StacheResult<Database> {
        let path = path.as_ref();
        let _span = trace_span!("load_database").entered();
        let json = std::fs::read_to_string(path).map_err(|err| StacheError::io(path, err))?;
        Database::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use crate::database::Database;
    use crate::image::RasterImage;
    use crate::template::{Target, Template};
    use crate::util::{Point, StacheError};

    fn sample_db() -> Database {
        let data = (0..20).map(|i| ((i * 7) % 11) as f32 / 11.0).collect();
        let image = RasterImage::new(data, 5, 4).unwrap();
        let target = Target {
            center: Point::new(2.5, 3.0),
            angle_deg: -8.0,
            width: 5.0,
        };
        let mut db = Database::with_negatives(vec![RasterImage::filled(8, 8, 0.3).unwrap()], 0.4)
            .unwrap();
        db.add_template(Template::new(image, target, "sample")).unwrap();
        db.add_mirrors();
        db
    }

    #[test]
    fn json_round_trip_preserves_thresholds() {
        let mut db = sample_db();
        db.strip_negatives();
        let restored = Database::from_json(&db.to_json().unwrap()).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.strictness(), db.strictness());
        for (a, b) in db.templates().iter().zip(restored.templates()) {
            assert_eq!(a.id(), b.id());
            assert_eq!(a.tag(), b.tag());
            assert_eq!(a.threshold(), b.threshold());
            assert_eq!(a.mirror_of(), b.mirror_of());
            assert_eq!(a.image(), b.image());
            assert_eq!(a.target(), b.target());
        }
    }

    #[test]
    fn rejects_dangling_mirror_reference() {
        let db = sample_db();
        let mut value: serde_json::Value = serde_json::from_str(&db.to_json().unwrap()).unwrap();
        value["templates"][1]["mirror_of"] = serde_json::json!(9);
        let err = Database::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, StacheError::Serialize { .. }));

        // A mirror of a mirror is not a valid pair either.
        value["templates"][1]["mirror_of"] = serde_json::json!(0);
        value["templates"][0]["mirror_of"] = serde_json::json!(1);
        assert!(Database::from_json(&value.to_string()).is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            Database::from_json("{\"templates\": 3}"),
            Err(StacheError::Serialize { .. })
        ));
    }

    #[test]
    fn save_and_load_through_disk() {
        let path = std::env::temp_dir().join(format!("stachematch-db-{}.json", std::process::id()));
        let db = sample_db();
        db.save(&path).unwrap();
        let restored = Database::load(&path).unwrap();
        assert_eq!(restored.negatives().len(), 1);
        assert_eq!(restored.templates()[0].threshold(), db.templates()[0].threshold());
        let _ = std::fs::remove_file(&path);
        assert!(matches!(Database::load(&path), Err(StacheError::Io { .. })));
    }
}
