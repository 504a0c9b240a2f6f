//! Test fixtures and helpers.
//!
//! A [`DiaryFixture`] wires one diary to a [`MockEngine`], a manual clock
//! and a store. [`Participant`]s hold everything a client needs to submit
//! scores and decrypt the trend.

use std::path::Path;
use std::sync::Arc;

use mood_diary::{DiaryConfig, MoodDiary, SubmitReceipt};
use mood_diary_client::{
    ClientError, DecryptionAuthorization, DecryptionAuthorizationProtocol,
    Decryptor, EncryptedInputBuilder, KeypairSigner, MemoryArtifactStorage,
};
use mood_diary_core::{CiphertextHandle, Identity, ManualClock, ResourceId, SigningKeypair};
use mood_diary_fhe::{EncryptedInput, FheEngine, MockEngine};
use mood_diary_store::{DiaryStore, MemoryStore, SqliteStore};

/// Start of time for every fixture clock.
pub const FIXTURE_EPOCH: u64 = 1_700_000_000;

pub type TestDiary = MoodDiary<Arc<dyn DiaryStore>, Arc<MockEngine>>;

/// Install a test-writer subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .try_init();
}

/// One diary with its engine, clock and store.
pub struct DiaryFixture {
    pub clock: Arc<ManualClock>,
    pub engine: Arc<MockEngine>,
    pub store: Arc<dyn DiaryStore>,
    pub owner: SigningKeypair,
    pub resource: ResourceId,
    pub diary: TestDiary,
}

impl DiaryFixture {
    /// A diary on a [`MemoryStore`] with default config.
    pub async fn memory() -> anyhow::Result<Self> {
        Self::with_store(Arc::new(MemoryStore::new()), DiaryConfig::default()).await
    }

    /// A diary on a [`SqliteStore`] at `path`.
    pub async fn sqlite(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Self::with_store(Arc::new(SqliteStore::open(path)?), DiaryConfig::default()).await
    }

    pub async fn with_store(store: Arc<dyn DiaryStore>, config: DiaryConfig) -> anyhow::Result<Self> {
        let clock = Arc::new(ManualClock::new(FIXTURE_EPOCH));
        let engine = Arc::new(MockEngine::with_clock(clock.clone()));
        let owner = SigningKeypair::from_seed(&[0xd1; 32]);
        let resource = ResourceId::derive(&owner.identity(), "mood-diary");

        let diary = MoodDiary::create_with_clock(
            resource,
            store.clone(),
            engine.clone(),
            config,
            clock.clone(),
        )
        .await?;

        Ok(Self {
            clock,
            engine,
            store,
            owner,
            resource,
            diary,
        })
    }

    /// Open this diary again through `store`, sharing the engine and clock.
    pub async fn reopen_with(&self, store: Arc<dyn DiaryStore>) -> anyhow::Result<TestDiary> {
        Ok(MoodDiary::open_with_clock(
            self.resource,
            store,
            self.engine.clone(),
            self.diary.config().clone(),
            self.clock.clone(),
        )
        .await?)
    }

    /// Open this diary again through the fixture's own store.
    pub async fn reopen(&self) -> anyhow::Result<TestDiary> {
        self.reopen_with(self.store.clone()).await
    }

    /// A participant with a deterministic key derived from `seed`.
    pub fn participant(&self, seed: u8) -> Participant {
        Participant::new(
            SigningKeypair::from_seed(&[seed; 32]),
            self.engine.clone(),
            self.clock.clone(),
        )
    }
}

/// A client: signing key, authorization protocol, decryptor and input builder.
pub struct Participant {
    pub keypair: SigningKeypair,
    pub storage: Arc<MemoryArtifactStorage>,
    pub protocol: DecryptionAuthorizationProtocol<KeypairSigner, Arc<MemoryArtifactStorage>>,
    pub decryptor: Decryptor<Arc<MockEngine>>,
    pub builder: EncryptedInputBuilder,
}

impl Participant {
    pub fn new(keypair: SigningKeypair, engine: Arc<MockEngine>, clock: Arc<ManualClock>) -> Self {
        let storage = Arc::new(MemoryArtifactStorage::new());
        let protocol = DecryptionAuthorizationProtocol::with_clock(
            KeypairSigner::new(keypair.clone()),
            storage.clone(),
            clock.clone(),
        );
        let builder = EncryptedInputBuilder::new(engine.encryption_context());
        let decryptor = Decryptor::with_clock(engine, clock);

        Self {
            keypair,
            storage,
            protocol,
            decryptor,
            builder,
        }
    }

    pub fn identity(&self) -> Identity {
        self.keypair.identity()
    }

    /// Encrypt `score` for `resource`, bound to this participant.
    pub fn encrypt(&self, resource: &ResourceId, score: u32) -> Result<EncryptedInput, ClientError> {
        self.builder.build(resource, &self.identity(), score)
    }

    /// Encrypt and submit `score` to `diary`.
    pub async fn submit(&self, diary: &TestDiary, score: u32) -> anyhow::Result<SubmitReceipt> {
        let input = self.encrypt(diary.resource(), score)?;
        Ok(diary.submit(&self.identity(), &input).await?)
    }

    /// A valid authorization covering `resources`, from cache or freshly signed.
    pub async fn authorize(
        &self,
        resources: &[ResourceId],
    ) -> Result<DecryptionAuthorization, ClientError> {
        self.protocol.load_or_create(resources, &self.identity()).await
    }

    /// Decrypt `handle`, which belongs to `resource`.
    pub async fn decrypt(
        &self,
        handle: &CiphertextHandle,
        resource: &ResourceId,
    ) -> Result<u32, ClientError> {
        let artifact = self.authorize(&[*resource]).await?;
        self.decryptor.decrypt(handle, resource, &artifact).await
    }

    /// Fetch this participant's trend handle from `diary` and decrypt it.
    pub async fn decrypt_personal(&self, diary: &TestDiary) -> Result<u32, ClientError> {
        let handle = diary.get_personal_handle(&self.identity()).await;
        self.decrypt(&handle, diary.resource()).await
    }
}

/// `n` participants with distinct deterministic keys.
pub fn multi_party(fixture: &DiaryFixture, n: usize) -> Vec<Participant> {
    (0..n)
        .map(|i| fixture.participant((i % 200) as u8 + 1))
        .collect()
}
