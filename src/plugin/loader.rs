//! Plugin discovery and loading.
//!
//! Built-in units load first, in registration order. User units follow,
//! one plugin directory after the other, each directory sorted by name.
//! A user unit is either `name.lua` or a directory `name/` holding
//! `init.lua`; entries starting with `.` or `_` are skipped.

// Rust guideline compliant 2026-02

use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};

use super::{BuiltinFactory, Control, Core, Events, Plugin};
use crate::config::LoadPolicy;
use crate::lua::LuaPlugin;

/// Where a plugin came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginOrigin {
    /// Compiled into the binary.
    Builtin,
    /// A Lua unit; the path is its entry file.
    Script(PathBuf),
}

/// A user unit found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginUnit {
    /// File stem, or directory name for package units.
    pub name: String,
    /// Entry file (`name.lua` or `name/init.lua`).
    pub entry: PathBuf,
    /// Package directory, for `require` lookups inside the unit.
    pub package_dir: Option<PathBuf>,
}

/// A loaded plugin with its capabilities.
pub struct PluginRecord {
    /// `internal:<name>` or the unit name.
    pub name: String,
    /// Where it came from.
    pub origin: PluginOrigin,
    /// Its Control.
    pub control: Control,
    /// The Events surface, when the plugin asked for it.
    pub events: Option<Events>,
    /// The plugin itself.
    pub plugin: Box<dyn Plugin>,
}

impl fmt::Debug for PluginRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRecord")
            .field("name", &self.name)
            .field("origin", &self.origin)
            .field("events", &self.events.is_some())
            .finish_non_exhaustive()
    }
}

/// Outcome of a load batch under [`LoadPolicy::Isolate`].
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Loaded plugins, in load order.
    pub plugins: Vec<PluginRecord>,
    /// Units that failed, with their error.
    pub failures: Vec<(String, anyhow::Error)>,
}

impl LoadReport {
    /// Names of the loaded plugins, in load order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.plugins.iter().map(|p| p.name.clone()).collect()
    }
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.') || name.starts_with('_')
}

fn unit_at(path: &Path) -> Option<PluginUnit> {
    let file_name = path.file_name()?.to_str()?;
    if is_hidden(file_name) {
        return None;
    }
    if path.is_dir() {
        let entry = path.join("init.lua");
        return entry.is_file().then(|| PluginUnit {
            name: file_name.to_string(),
            entry,
            package_dir: Some(path.to_path_buf()),
        });
    }
    let stem = file_name.strip_suffix(".lua")?;
    Some(PluginUnit {
        name: stem.to_string(),
        entry: path.to_path_buf(),
        package_dir: None,
    })
}

/// Find user units in `dirs`. Missing or unreadable directories are logged
/// and skipped.
#[must_use]
pub fn discover_units(dirs: &[PathBuf]) -> Vec<PluginUnit> {
    let mut units = Vec::new();
    for dir in dirs {
        if !dir.is_dir() {
            log::warn!("Plugins directory doesn't exist: {}", dir.display());
            continue;
        }
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Failed to read plugins directory {}: {e}", dir.display());
                continue;
            }
        };
        let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
        paths.sort();
        units.extend(paths.iter().filter_map(|p| unit_at(p)));
    }
    units
}

fn attach(
    core: &Rc<Core>,
    events: &Events,
    name: String,
    origin: PluginOrigin,
    build: impl FnOnce(Control) -> Result<Box<dyn Plugin>>,
) -> Result<PluginRecord> {
    let control = Control::new(core, &name);
    let mut plugin = build(control.clone())?;
    let events = if plugin.wants_events() {
        plugin
            .bind_events(events.clone())
            .context("Failed to bind events")?;
        Some(events.clone())
    } else {
        None
    };
    log::debug!("Constructed plugin '{name}'");
    Ok(PluginRecord {
        name,
        origin,
        control,
        events,
        plugin,
    })
}

/// Construct every plugin: `builtins` first, then the units found in
/// `dirs`.
///
/// # Errors
///
/// Under [`LoadPolicy::FailFast`], the first unit that fails aborts the
/// batch. Under [`LoadPolicy::Isolate`] failures are logged, recorded in
/// the report and skipped.
pub fn load_plugins(
    core: &Rc<Core>,
    events: &Events,
    builtins: &[(&str, BuiltinFactory)],
    dirs: &[PathBuf],
    policy: LoadPolicy,
) -> Result<LoadReport> {
    log::info!("Loading plugins");
    let mut report = LoadReport::default();

    let mut record = |name: String, result: Result<PluginRecord>| -> Result<()> {
        match result {
            Ok(plugin) => report.plugins.push(plugin),
            Err(e) => {
                let e = e.context(format!("Failed to load plugin '{name}'"));
                if policy == LoadPolicy::FailFast {
                    return Err(e);
                }
                log::error!("{e:#}");
                report.failures.push((name, e));
            }
        }
        Ok(())
    };

    for (unit, factory) in builtins {
        let name = format!("internal:{unit}");
        let result = attach(core, events, name.clone(), PluginOrigin::Builtin, |ctl| {
            Ok(factory(ctl))
        });
        record(name, result)?;
    }

    for unit in discover_units(dirs) {
        let origin = PluginOrigin::Script(unit.entry.clone());
        let result = attach(core, events, unit.name.clone(), origin, |ctl| {
            Ok(Box::new(LuaPlugin::load(&unit, ctl)?) as Box<dyn Plugin>)
        });
        record(unit.name, result)?;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::config::Config;
    use crate::process::SystemRunner;
    use crate::runtime::Scheduler;
    use crate::wm::WindowManager;

    struct Quiet;

    impl Plugin for Quiet {}

    fn quiet(_: Control) -> Box<dyn Plugin> {
        Box::new(Quiet)
    }

    fn core(dir: &Path) -> Rc<Core> {
        let sched = Scheduler::new().expect("Should build scheduler");
        let config = Config::with_data_dir(dir.to_path_buf());
        Core::new(WindowManager::new(), sched, Rc::new(SystemRunner), config)
    }

    #[test]
    fn test_discover_sorts_and_skips() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let root = dir.path();
        fs::write(root.join("b.lua"), "").expect("Should write");
        fs::write(root.join("a.lua"), "").expect("Should write");
        fs::write(root.join("_private.lua"), "").expect("Should write");
        fs::write(root.join(".hidden.lua"), "").expect("Should write");
        fs::write(root.join("notes.txt"), "").expect("Should write");
        fs::create_dir(root.join("pkg")).expect("Should mkdir");
        fs::write(root.join("pkg/init.lua"), "").expect("Should write");
        fs::create_dir(root.join("empty")).expect("Should mkdir");

        let units = discover_units(&[root.to_path_buf(), root.join("missing")]);
        let names: Vec<&str> = units.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "pkg"]);
        assert_eq!(units[2].entry, root.join("pkg/init.lua"));
        assert_eq!(units[2].package_dir.as_deref(), Some(root.join("pkg").as_path()));
    }

    #[test]
    fn test_isolate_skips_broken_units() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let plugins = dir.path().join("plugins");
        fs::create_dir(&plugins).expect("Should mkdir");
        fs::write(plugins.join("good.lua"), "plugin.register{}").expect("Should write");
        fs::write(plugins.join("silent.lua"), "local x = 1").expect("Should write");

        let core = core(dir.path());
        let report = load_plugins(
            &core,
            &Events::new(),
            &[("quiet", quiet as BuiltinFactory)],
            &[plugins],
            LoadPolicy::Isolate,
        )
        .expect("Isolate never fails the batch");

        assert_eq!(report.names(), vec!["internal:quiet", "good"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "silent");
        assert_eq!(report.plugins[0].origin, PluginOrigin::Builtin);
    }

    #[test]
    fn test_fail_fast_aborts() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let plugins = dir.path().join("plugins");
        fs::create_dir(&plugins).expect("Should mkdir");
        fs::write(plugins.join("broken.lua"), "this is not lua").expect("Should write");

        let core = core(dir.path());
        let err = load_plugins(&core, &Events::new(), &[], &[plugins], LoadPolicy::FailFast)
            .expect_err("Broken unit should abort the batch");
        assert!(format!("{err:#}").contains("Failed to load plugin 'broken'"));
    }
}
