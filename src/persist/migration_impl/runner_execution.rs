impl MigrationDecision {
    /// Returns true when the runner hands the snapshot back untouched.
    pub fn is_noop(&self) -> bool {
        !matches!(self, MigrationDecision::Upgrade { .. })
    }

    /// Versions that will be applied, in order.
    pub fn versions(&self) -> &[u32] {
        match self {
            MigrationDecision::Upgrade { versions, .. } => versions,
            _ => &[],
        }
    }
}

impl MigrationRunner {
    pub fn new(registry: Arc<MigrationRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &MigrationRegistry {
        &self.registry
    }

    /// Describes what [`migrate`](Self::migrate) would do without running anything.
    pub fn plan(
        &self,
        snapshot: Option<&PersistedSnapshot>,
        current_version: u32,
    ) -> MigrationDecision {
        match snapshot {
            None => MigrationDecision::FreshInstall,
            Some(snapshot) => self.decide(snapshot.version(), current_version),
        }
    }

    fn decide(&self, inbound: u32, current: u32) -> MigrationDecision {
        if inbound == current {
            return MigrationDecision::UpToDate { version: inbound };
        }
        if inbound > current {
            return MigrationDecision::Downgrade { inbound, current };
        }
        MigrationDecision::Upgrade {
            from: inbound,
            to: current,
            versions: self.registry.versions_in_range(inbound, current),
        }
    }

    /// Migrates an inbound persisted snapshot to `current_version`.
    ///
    /// Returns `Ok(None)` when there is no snapshot, hands the snapshot back
    /// unchanged when it is current or newer, and otherwise folds every
    /// registered migration in `(inbound, current]` in ascending order. The
    /// first failing migration aborts the fold and its error is returned.
    ///
    /// The version marker is not stamped here; each migration sets its own.
    pub async fn migrate(
        &self,
        snapshot: Option<PersistedSnapshot>,
        current_version: u32,
    ) -> Result<Option<PersistedSnapshot>> {
        let span = info_span!("persist.migrate", current_version);
        self.migrate_inner(snapshot, current_version)
            .instrument(span)
            .await
    }

    async fn migrate_inner(
        &self,
        snapshot: Option<PersistedSnapshot>,
        current_version: u32,
    ) -> Result<Option<PersistedSnapshot>> {
        let Some(mut snapshot) = snapshot else {
            event!(Level::DEBUG, "no persisted snapshot, nothing to migrate");
            return Ok(None);
        };

        let inbound = snapshot.version();
        match self.decide(inbound, current_version) {
            MigrationDecision::UpToDate { version } => {
                event!(Level::DEBUG, version, "persisted snapshot is up to date");
                Ok(Some(snapshot))
            }
            MigrationDecision::Downgrade { inbound, current } => {
                event!(
                    Level::WARN,
                    inbound,
                    current,
                    "persisted snapshot is newer than this build, leaving it untouched"
                );
                Ok(Some(snapshot))
            }
            MigrationDecision::Upgrade { from, to, versions } => {
                event!(
                    Level::INFO,
                    from,
                    to,
                    versions = ?versions,
                    "migrating persisted snapshot"
                );

                for step in self.registry.steps_in_range(from, to) {
                    event!(
                        Level::DEBUG,
                        version = step.version,
                        name = %step.name,
                        "applying migration"
                    );
                    snapshot = match step.apply(snapshot).await {
                        Ok(next) => next,
                        Err(err) => {
                            event!(
                                Level::ERROR,
                                version = step.version,
                                name = %step.name,
                                error = %err,
                                "migration failed"
                            );
                            return Err(PersistError::MigrationStep {
                                version: step.version,
                                name: step.name.clone(),
                                source: Box::new(err),
                            });
                        }
                    };
                }

                if snapshot.version() < to {
                    event!(
                        Level::DEBUG,
                        marker = snapshot.version(),
                        to,
                        "migrated snapshot carries an older version marker"
                    );
                }
                Ok(Some(snapshot))
            }
            MigrationDecision::FreshInstall => Ok(None),
        }
    }
}
