//! Panel topology detection from the sensor capability registry.

use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};

use log::{debug, info};

/// Sensor type reported only by devices with a fold-state sensor.
pub const FOLD_STATE_SENSOR_TYPE: &str = "android.sensor.fold_state";

/// Default location of the sensor class directory.
pub const DEFAULT_SENSORS_DIR: &str = "/sys/class/sensors";

/// Number of physical display panels on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelTopology {
    #[default]
    Single,
    Dual,
}

impl fmt::Display for PanelTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PanelTopology::Single => f.write_str("single panel"),
            PanelTopology::Dual => f.write_str("dual panel"),
        }
    }
}

/// One entry of the capability registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorDescriptor {
    pub name: String,
    pub string_type: String,
}

impl SensorDescriptor {
    /// Builds a descriptor from a display name and a sensor type string.
    pub fn new(name: impl Into<String>, string_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            string_type: string_type.into(),
        }
    }
}

/// Source of sensor capability descriptors.
#[cfg_attr(test, mockall::automock)]
pub trait CapabilityRegistry: Send + Sync {
    /// Lists every descriptor, without filtering by category.
    fn enumerate(&self) -> io::Result<Vec<SensorDescriptor>>;
}

/// Classifies the device by a single full enumeration of `registry`.
///
/// An unavailable registry is treated as an empty one, which classifies as
/// [`PanelTopology::Single`].
pub fn detect(registry: &dyn CapabilityRegistry) -> PanelTopology {
    let descriptors = match registry.enumerate() {
        Ok(descriptors) => descriptors,
        Err(e) => {
            info!("Sensor registry unavailable ({e}), assuming single panel");
            return PanelTopology::Single;
        }
    };

    if descriptors.is_empty() {
        info!("Sensor registry is empty, assuming single panel");
        return PanelTopology::Single;
    }

    match descriptors
        .iter()
        .find(|d| d.string_type == FOLD_STATE_SENSOR_TYPE)
    {
        Some(sensor) => {
            debug!("Found fold state sensor '{}'", sensor.name);
            PanelTopology::Dual
        }
        None => PanelTopology::Single,
    }
}

/// Registry backed by a sensor class directory.
///
/// Every subdirectory is one sensor. Its type string comes from the `type`
/// attribute, then `name`, then the directory name itself.
pub struct SensorDirectoryRegistry {
    root: PathBuf,
}

impl SensorDirectoryRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_attr(dir: &Path, attr: &str) -> Option<String> {
        fs::read_to_string(dir.join(attr))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Describes one directory entry; unreadable entries and plain files are skipped.
    fn describe(entry: io::Result<fs::DirEntry>) -> Option<SensorDescriptor> {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable sensor entry: {e}");
                return None;
            }
        };
        let dir = entry.path();
        if !dir.is_dir() {
            return None;
        }

        let dir_name = entry.file_name().to_string_lossy().into_owned();
        let name = Self::read_attr(&dir, "name").unwrap_or_else(|| dir_name.clone());
        let string_type = Self::read_attr(&dir, "type").unwrap_or_else(|| name.clone());

        debug!("Sensor '{name}' of type '{string_type}'");
        Some(SensorDescriptor { name, string_type })
    }
}

impl CapabilityRegistry for SensorDirectoryRegistry {
    fn enumerate(&self) -> io::Result<Vec<SensorDescriptor>> {
        Ok(fs::read_dir(&self.root)?
            .filter_map(Self::describe)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn registry_with(descriptors: Vec<SensorDescriptor>) -> MockCapabilityRegistry {
        let mut registry = MockCapabilityRegistry::new();
        registry
            .expect_enumerate()
            .times(1)
            .returning(move || Ok(descriptors.clone()));
        registry
    }

    #[test]
    fn fold_state_sensor_means_dual() {
        let registry = registry_with(vec![SensorDescriptor::new(
            "Fold State",
            FOLD_STATE_SENSOR_TYPE,
        )]);
        assert_eq!(detect(&registry), PanelTopology::Dual);
    }

    #[test]
    fn empty_registry_means_single() {
        let registry = registry_with(Vec::new());
        assert_eq!(detect(&registry), PanelTopology::Single);
    }

    #[test]
    fn unavailable_registry_means_single() {
        let mut registry = MockCapabilityRegistry::new();
        registry
            .expect_enumerate()
            .times(1)
            .returning(|| Err(io::Error::from(io::ErrorKind::NotFound)));
        assert_eq!(detect(&registry), PanelTopology::Single);
    }

    #[test]
    fn match_is_exact() {
        let registry = registry_with(vec![
            SensorDescriptor::new("a", "android.sensor.fold_state_ext"),
            SensorDescriptor::new("b", "ANDROID.SENSOR.FOLD_STATE"),
            SensorDescriptor::new("c", " android.sensor.fold_state"),
            SensorDescriptor::new("d", "android.sensor.hinge_angle"),
        ]);
        assert_eq!(detect(&registry), PanelTopology::Single);
    }

    #[test]
    fn directory_registry_reads_type_then_name() {
        let root = TempDir::new().unwrap();

        let fold = root.path().join("fold_sensor");
        fs::create_dir(&fold).unwrap();
        fs::write(fold.join("name"), "Fold State\n").unwrap();
        fs::write(fold.join("type"), "android.sensor.fold_state\n").unwrap();

        let light = root.path().join("light_sensor");
        fs::create_dir(&light).unwrap();
        fs::write(light.join("name"), "TCS3701\n").unwrap();

        fs::create_dir(root.path().join("proximity_sensor")).unwrap();
        fs::write(root.path().join("stray_file"), "ignored").unwrap();

        let registry = SensorDirectoryRegistry::new(root.path());
        let mut descriptors = registry.enumerate().unwrap();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(
            descriptors,
            vec![
                SensorDescriptor::new("Fold State", FOLD_STATE_SENSOR_TYPE),
                SensorDescriptor::new("TCS3701", "TCS3701"),
                SensorDescriptor::new("proximity_sensor", "proximity_sensor"),
            ]
        );
        assert_eq!(detect(&registry), PanelTopology::Dual);
    }

    #[test]
    fn missing_directory_is_unavailable() {
        let root = TempDir::new().unwrap();
        let registry = SensorDirectoryRegistry::new(root.path().join("absent"));

        assert!(registry.enumerate().is_err());
        assert_eq!(detect(&registry), PanelTopology::Single);
    }

    #[test]
    fn unreadable_entry_is_skipped() {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join("fold_sensor")).unwrap();
        fs::write(root.path().join("fold_sensor").join("type"), FOLD_STATE_SENSOR_TYPE).unwrap();

        let failing = Err(io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(SensorDirectoryRegistry::describe(failing), None);

        let descriptors: Vec<_> = std::iter::once(failing_entry())
            .chain(fs::read_dir(root.path()).unwrap())
            .filter_map(SensorDirectoryRegistry::describe)
            .collect();
        assert_eq!(
            descriptors,
            vec![SensorDescriptor::new("fold_sensor", FOLD_STATE_SENSOR_TYPE)]
        );
    }

    fn failing_entry() -> io::Result<fs::DirEntry> {
        Err(io::Error::other("stale directory handle"))
    }

    fn sensor_type() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("android.sensor.accelerometer".to_string()),
            Just("android.sensor.hinge_angle".to_string()),
            Just("android.sensor.light".to_string()),
            "[a-z._]{0,32}",
        ]
    }

    proptest! {
        #[test]
        fn dual_iff_fold_state_present(
            mut types in prop::collection::vec(sensor_type(), 0..16),
            insert_at in any::<prop::sample::Index>(),
            with_fold in any::<bool>(),
        ) {
            types.retain(|t| t != FOLD_STATE_SENSOR_TYPE);
            if with_fold {
                let at = insert_at.index(types.len() + 1);
                types.insert(at, FOLD_STATE_SENSOR_TYPE.to_string());
            }

            let descriptors = types
                .into_iter()
                .enumerate()
                .map(|(i, t)| SensorDescriptor::new(format!("sensor{i}"), t))
                .collect();
            let expected = if with_fold { PanelTopology::Dual } else { PanelTopology::Single };

            prop_assert_eq!(detect(&registry_with(descriptors)), expected);
        }
    }
}
