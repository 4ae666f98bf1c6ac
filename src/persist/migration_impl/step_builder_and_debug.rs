impl std::fmt::Debug for MigrationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationStep")
            .field("version", &self.version)
            .field("name", &self.name)
            .finish()
    }
}

impl MigrationStep {
    /// Creates a step from a synchronous, pure migration.
    pub fn new<F>(version: u32, name: impl Into<String>, migrator: F) -> Self
    where
        F: Fn(PersistedSnapshot) -> Result<PersistedSnapshot> + Send + Sync + 'static,
    {
        Self {
            version,
            name: name.into(),
            migrator: Arc::new(move |snapshot| future::ready(migrator(snapshot)).boxed()),
        }
    }

    /// Creates a step whose migration awaits I/O (auxiliary storage, network lookups).
    pub fn new_async<F, Fut>(version: u32, name: impl Into<String>, migrator: F) -> Self
    where
        F: Fn(PersistedSnapshot) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<PersistedSnapshot>> + Send + 'static,
    {
        Self {
            version,
            name: name.into(),
            migrator: Arc::new(move |snapshot| migrator(snapshot).boxed()),
        }
    }

    /// Runs the migration against `snapshot`.
    pub async fn apply(&self, snapshot: PersistedSnapshot) -> Result<PersistedSnapshot> {
        (self.migrator)(snapshot).await
    }
}
