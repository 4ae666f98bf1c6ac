impl MigrationRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from an explicit list of steps.
    pub fn from_steps<I>(steps: I) -> Result<Self>
    where
        I: IntoIterator<Item = MigrationStep>,
    {
        let mut registry = Self::new();
        for step in steps {
            registry.add_step(step)?;
        }
        Ok(registry)
    }

    /// Registers a step, rejecting reserved or duplicate versions.
    ///
    /// Version `0` denotes pre-versioning state and cannot carry a migration.
    pub fn add_step(&mut self, step: MigrationStep) -> Result<()> {
        if step.version == 0 {
            return Err(PersistError::InvalidMigration(format!(
                "Migration '{}' must target a version >= 1",
                step.name
            )));
        }
        if step.name.trim().is_empty() {
            return Err(PersistError::InvalidMigration(format!(
                "Migration for version {} must have a name",
                step.version
            )));
        }
        if self.steps.contains_key(&step.version) {
            return Err(PersistError::DuplicateMigration(step.version));
        }

        self.steps.insert(step.version, step);
        Ok(())
    }

    /// Fluent builder method to add a step.
    pub fn with_step(mut self, step: MigrationStep) -> Result<Self> {
        self.add_step(step)?;
        Ok(self)
    }

    /// Returns every registered version in `(from_exclusive, to_inclusive]`, ascending.
    ///
    /// Unregistered versions inside the range are skipped, not reported.
    pub fn versions_in_range(&self, from_exclusive: u32, to_inclusive: u32) -> Vec<u32> {
        self.steps_in_range(from_exclusive, to_inclusive)
            .map(|step| step.version)
            .collect()
    }

    pub(crate) fn steps_in_range(
        &self,
        from_exclusive: u32,
        to_inclusive: u32,
    ) -> impl Iterator<Item = &MigrationStep> {
        let range = if from_exclusive >= to_inclusive {
            None
        } else {
            Some(self.steps.range(from_exclusive + 1..=to_inclusive))
        };
        range.into_iter().flatten().map(|(_, step)| step)
    }

    pub fn get(&self, version: u32) -> Option<&MigrationStep> {
        self.steps.get(&version)
    }

    /// Returns all registered versions in ascending order.
    pub fn versions(&self) -> Vec<u32> {
        self.steps.keys().copied().collect()
    }

    pub fn steps(&self) -> impl Iterator<Item = &MigrationStep> {
        self.steps.values()
    }

    pub fn latest_version(&self) -> Option<u32> {
        self.steps.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
