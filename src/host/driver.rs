//! Reference host: drives the lifecycle hooks against a manifest and a state
//! store the way an infrastructure runtime would.
//!
//! The driver never saves the store itself; callers persist it once per run
//! with [`StateStore::save`], whether or not individual resources failed.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use serde::Serialize;

use crate::core::errors::StickyError;
use crate::logger::jsonl::{EventType, LogEntry, Severity};
use crate::model::diagnostics::Diagnostics;
use crate::model::file::ManagedFile;
use crate::plan::planner::{Plan, PlanAction, plan};
use crate::resource::reconciler::{Action, Outcome, StickyFileResource};

use super::manifest::Manifest;
use super::store::StateStore;

/// What happened to one named resource during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceReport {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planned: Option<PlanAction>,
    pub actions: Vec<Action>,
    pub diagnostics: Diagnostics,
}

impl ResourceReport {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            planned: None,
            actions: Vec::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    fn absorb(&mut self, outcome: Outcome) {
        self.actions.push(outcome.action);
        self.diagnostics.extend(outcome.diagnostics);
    }

    pub fn failed(&self) -> bool {
        self.diagnostics.has_error()
    }
}

/// Per-resource reports of one driver command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub command: &'static str,
    pub resources: Vec<ResourceReport>,
}

impl RunReport {
    /// True if any resource produced an error diagnostic.
    pub fn failed(&self) -> bool {
        self.resources.iter().any(ResourceReport::failed)
    }

    pub fn failed_count(&self) -> usize {
        self.resources.iter().filter(|r| r.failed()).count()
    }

    pub fn resource(&self, name: &str) -> Option<&ResourceReport> {
        self.resources.iter().find(|r| r.name == name)
    }
}

/// Resource implementation plus the records it has produced so far.
pub struct Driver {
    resource: StickyFileResource,
    store: StateStore,
}

impl Driver {
    pub fn new(resource: StickyFileResource, store: StateStore) -> Self {
        Self { resource, store }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn into_parts(self) -> (StickyFileResource, StateStore) {
        (self.resource, self.store)
    }

    /// Read every stored record, regenerating files that vanished.
    pub fn refresh(&mut self) -> RunReport {
        let started = Instant::now();
        let mut reports = BTreeMap::new();
        self.refresh_into(&mut reports, &BTreeSet::new());
        let report = finish("refresh", reports);
        self.log_summary(EventType::RefreshComplete, &report, started);
        report
    }

    /// Compute actions without touching the filesystem or the store.
    pub fn plan(&self, manifest: &Manifest) -> RunReport {
        let (plans, mut reports) = self.plan_all(manifest);
        for (name, planned) in &plans {
            if let Some(report) = reports.get_mut(name) {
                report.planned = Some(planned.action());
            }
        }
        finish("plan", reports)
    }

    /// Converge the filesystem and the store on `manifest`.
    ///
    /// Nothing is written if any configured resource fails to plan.
    pub fn apply(&mut self, manifest: &Manifest) -> RunReport {
        let started = Instant::now();
        let (plans, mut reports) = self.plan_all(manifest);

        if reports.values().any(ResourceReport::failed) {
            let report = finish("apply", reports);
            self.log_summary(EventType::ValidationFailed, &report, started);
            return report;
        }

        if let Some(writer) = self.resource.activity_mut() {
            let mut entry = LogEntry::new(EventType::ApplyStart, Severity::Info);
            entry.details = Some(format!("{} resource(s) planned", plans.len()));
            writer.write_entry(&entry);
        }

        // Files about to be removed are not healed first.
        let removing: BTreeSet<String> = plans
            .iter()
            .filter(|(_, p)| matches!(p.action(), PlanAction::Replace | PlanAction::Delete))
            .map(|(name, _)| name.clone())
            .collect();
        self.refresh_into(&mut reports, &removing);

        // Every removal runs before any write: a renamed resource may keep the
        // path of the one it replaces.
        let mut blocked = BTreeSet::new();
        for (name, planned) in &plans {
            let old = match planned {
                Planned::Orphan(stored) => stored.clone(),
                Planned::Apply(p) if p.action == PlanAction::Replace => {
                    match self.store.get(name) {
                        Some(old) => old.clone(),
                        None => continue,
                    }
                }
                Planned::Apply(_) => continue,
            };
            let report = report_for(&mut reports, name);
            report.planned = Some(planned.action());
            self.resource.set_resource_name(Some(name));
            let outcome = self.resource.delete(&old);
            if !outcome.succeeded() {
                blocked.insert(name.clone());
            }
            self.store.apply(name, outcome.state.clone());
            report.absorb(outcome);
        }

        for (name, planned) in plans {
            let Planned::Apply(Plan { action, planned }) = planned else {
                continue;
            };
            let report = report_for(&mut reports, &name);
            report.planned = Some(action);
            if blocked.contains(&name) {
                continue;
            }
            self.resource.set_resource_name(Some(&name));
            let outcome = match action {
                PlanAction::NoOp => continue,
                PlanAction::Create | PlanAction::Replace => self.resource.create(&planned),
                PlanAction::Update => self.resource.update(&planned),
                PlanAction::Delete => self.resource.delete(&planned),
            };
            self.store.apply(&name, outcome.state.clone());
            report.absorb(outcome);
        }
        self.resource.set_resource_name(None);

        let report = finish("apply", reports);
        self.log_summary(EventType::ApplyComplete, &report, started);
        report
    }

    /// Delete every stored record.
    pub fn destroy(&mut self) -> RunReport {
        let started = Instant::now();
        let mut reports = BTreeMap::new();
        for name in self.store.names() {
            let Some(file) = self.store.get(&name).cloned() else {
                continue;
            };
            self.resource.set_resource_name(Some(&name));
            let outcome = self.resource.delete(&file);
            self.store.apply(&name, outcome.state.clone());
            let mut report = ResourceReport::new(&name);
            report.planned = Some(PlanAction::Delete);
            report.absorb(outcome);
            reports.insert(name, report);
        }
        self.resource.set_resource_name(None);

        let report = finish("destroy", reports);
        self.log_summary(EventType::DestroyComplete, &report, started);
        report
    }

    /// Adopt the file at `path` under `name`.
    pub fn import(&mut self, name: &str, path: &str) -> RunReport {
        let mut report = ResourceReport::new(name);
        if self.store.contains(name) {
            report.actions.push(Action::Failed);
            report.diagnostics.push(StickyError::StateConflict {
                name: name.to_string(),
                details: "already managed; destroy it or pick another name".to_string(),
            });
        } else {
            self.resource.set_resource_name(Some(name));
            let outcome = self.resource.import_state(path);
            self.resource.set_resource_name(None);
            self.store.apply(name, outcome.state.clone());
            report.absorb(outcome);
        }
        RunReport {
            command: "import",
            resources: vec![report],
        }
    }

    // ──────────────────────── internals ────────────────────────

    fn refresh_into(
        &mut self,
        reports: &mut BTreeMap<String, ResourceReport>,
        skip: &BTreeSet<String>,
    ) {
        for name in self.store.names() {
            if skip.contains(&name) {
                continue;
            }
            let Some(file) = self.store.get(&name).cloned() else {
                continue;
            };
            self.resource.set_resource_name(Some(&name));
            let outcome = self.resource.read(&file);
            self.store.apply(&name, outcome.state.clone());
            report_for(reports, &name).absorb(outcome);
        }
        self.resource.set_resource_name(None);
    }

    fn plan_all(
        &self,
        manifest: &Manifest,
    ) -> (Vec<(String, Planned)>, BTreeMap<String, ResourceReport>) {
        let mut plans = Vec::new();
        let mut reports = BTreeMap::new();

        for (name, config) in &manifest.files {
            let mut report = ResourceReport::new(name);
            match plan(config, self.store.get(name)) {
                Ok(p) => plans.push((name.clone(), Planned::Apply(p))),
                Err(diags) => report.diagnostics.extend(diags),
            }
            reports.insert(name.clone(), report);
        }
        for (name, stored) in self.store.iter() {
            if !manifest.files.contains_key(name) {
                plans.push((name.clone(), Planned::Orphan(stored.clone())));
                reports.insert(name.clone(), ResourceReport::new(name));
            }
        }
        (plans, reports)
    }

    fn log_summary(&mut self, event: EventType, report: &RunReport, started: Instant) {
        let failed = report.failed_count();
        let severity = if failed == 0 {
            Severity::Info
        } else {
            Severity::Warning
        };
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        if let Some(writer) = self.resource.activity_mut() {
            let mut entry = LogEntry::new(event, severity);
            entry.ok = Some(failed == 0);
            entry.duration_ms = Some(duration_ms);
            entry.details = Some(format!(
                "{} resource(s), {failed} failed",
                report.resources.len()
            ));
            writer.write_entry(&entry);
        }
    }
}

enum Planned {
    Apply(Plan),
    /// Stored but no longer configured.
    Orphan(ManagedFile),
}

impl Planned {
    const fn action(&self) -> PlanAction {
        match self {
            Self::Apply(p) => p.action,
            Self::Orphan(_) => PlanAction::Delete,
        }
    }
}

fn report_for<'a>(
    reports: &'a mut BTreeMap<String, ResourceReport>,
    name: &str,
) -> &'a mut ResourceReport {
    reports
        .entry(name.to_string())
        .or_insert_with(|| ResourceReport::new(name))
}

fn finish(command: &'static str, reports: BTreeMap<String, ResourceReport>) -> RunReport {
    RunReport {
        command,
        resources: reports.into_values().collect(),
    }
}
