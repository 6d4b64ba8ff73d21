//! Test helpers for xavyo-directory-repository integration tests.
//!
//! Provides test entities, projections and DTOs, a client that records the
//! operations it forwards, and fixtures over an in-memory directory.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use xavyo_directory::async_trait;
use xavyo_directory::prelude::*;
use xavyo_directory_repository::prelude::*;

// =============================================================================
// Entities
// =============================================================================

/// A person stored as an `inetOrgPerson` below `ou=people`.
#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub dn: Option<Dn>,
    pub cn: String,
    pub sn: Option<String>,
    pub mail: Option<String>,
    pub employee_id: Option<i64>,
}

impl Person {
    pub fn new(cn: &str, sn: &str) -> Self {
        Self {
            dn: None,
            cn: cn.to_string(),
            sn: Some(sn.to_string()),
            mail: Some(format!("{}@example.com", cn.to_lowercase())),
            employee_id: None,
        }
    }

    pub fn with_employee_id(mut self, id: i64) -> Self {
        self.employee_id = Some(id);
        self
    }
}

impl DirectoryEntity for Person {
    const OBJECT_CLASSES: &'static [&'static str] = &["top", "person", "inetOrgPerson"];
    const BASE: &'static str = "ou=people";
    const PROPERTIES: &'static [PropertyDescriptor] = &[
        PropertyDescriptor::id("dn"),
        PropertyDescriptor::naming("cn", "cn"),
        PropertyDescriptor::attribute("sn", "sn"),
        PropertyDescriptor::attribute("mail", "mail"),
        PropertyDescriptor::attribute("employeeId", "employeeNumber"),
    ];

    fn id(&self) -> Option<&Dn> {
        self.dn.as_ref()
    }

    fn set_id(&mut self, id: Dn) {
        self.dn = Some(id);
    }

    fn to_attributes(&self) -> AttributeSet {
        AttributeSet::new()
            .with("cn", self.cn.as_str())
            .with("sn", self.sn.clone())
            .with("mail", self.mail.clone())
            .with("employeeNumber", self.employee_id)
    }

    fn from_entry(entry: DirectoryEntry) -> DirectoryResult<Self> {
        let attributes = &entry.attributes;
        let cn = attributes.get_string("cn").unwrap_or_default().to_string();
        Ok(Self {
            sn: attributes.get_string("sn").map(ToOwned::to_owned),
            mail: attributes.get_string("mail").map(ToOwned::to_owned),
            employee_id: attributes
                .get("employeeNumber")
                .and_then(AttributeValue::as_integer),
            cn,
            dn: Some(entry.dn),
        })
    }
}

/// A role that tracks whether it has been stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Role {
    pub dn: Option<Dn>,
    pub name: String,
    pub stored: bool,
}

impl Persistable for Role {
    fn is_new(&self) -> bool {
        !self.stored
    }
}

impl DirectoryEntity for Role {
    const OBJECT_CLASSES: &'static [&'static str] = &["organizationalRole"];
    const BASE: &'static str = "ou=roles";
    const PROPERTIES: &'static [PropertyDescriptor] = &[
        PropertyDescriptor::id("dn"),
        PropertyDescriptor::naming("name", "cn"),
        PropertyDescriptor::transient("stored"),
    ];

    fn id(&self) -> Option<&Dn> {
        self.dn.as_ref()
    }

    fn set_id(&mut self, id: Dn) {
        self.dn = Some(id);
    }

    fn to_attributes(&self) -> AttributeSet {
        AttributeSet::new().with("cn", self.name.as_str())
    }

    fn from_entry(entry: DirectoryEntry) -> DirectoryResult<Self> {
        Ok(Self {
            name: entry
                .attributes
                .get_string("cn")
                .unwrap_or_default()
                .to_string(),
            dn: Some(entry.dn),
            stored: true,
        })
    }

    fn as_persistable(&self) -> Option<&dyn Persistable> {
        Some(self)
    }
}

// =============================================================================
// Projections and DTOs
// =============================================================================

/// Closed projection over a person's name and employee id.
#[derive(Debug)]
pub struct PersonSummary(ProjectionProxy);

impl PersonSummary {
    pub fn cn(&self) -> Option<String> {
        self.0.get_string("cn")
    }

    pub fn employee_id(&self) -> Option<i64> {
        self.0.get_integer("employeeId")
    }

    pub fn mail(&self) -> Option<String> {
        self.0.get_string("mail")
    }
}

impl Projection for PersonSummary {
    fn information() -> ProjectionInformation {
        ProjectionInformation::closed(["cn", "employeeId"])
    }

    fn from_proxy(proxy: ProjectionProxy) -> Self {
        Self(proxy)
    }
}

impl<S: DirectoryEntity> ResultType<S> for PersonSummary {
    fn shape() -> ResultShape<S, Self> {
        ResultShape::projection()
    }
}

/// Closed projection over a person's DN and name.
#[derive(Debug)]
pub struct PersonLink(ProjectionProxy);

impl PersonLink {
    pub fn dn(&self) -> Option<String> {
        self.0.get_string("dn")
    }

    pub fn cn(&self) -> Option<String> {
        self.0.get_string("cn")
    }
}

impl Projection for PersonLink {
    fn information() -> ProjectionInformation {
        ProjectionInformation::closed(["dn", "cn"])
    }

    fn from_proxy(proxy: ProjectionProxy) -> Self {
        Self(proxy)
    }
}

impl<S: DirectoryEntity> ResultType<S> for PersonLink {
    fn shape() -> ResultShape<S, Self> {
        ResultShape::projection()
    }
}

/// Closed projection over the DN alone.
#[derive(Debug)]
pub struct PersonDn(pub ProjectionProxy);

impl Projection for PersonDn {
    fn information() -> ProjectionInformation {
        ProjectionInformation::closed(["dn"])
    }

    fn from_proxy(proxy: ProjectionProxy) -> Self {
        Self(proxy)
    }
}

impl<S: DirectoryEntity> ResultType<S> for PersonDn {
    fn shape() -> ResultShape<S, Self> {
        ResultShape::projection()
    }
}

/// Open projection reading any property.
#[derive(Debug)]
pub struct PersonView(ProjectionProxy);

impl PersonView {
    pub fn get(&self, property: &str) -> Option<String> {
        self.0.get_string(property)
    }
}

impl Projection for PersonView {
    fn information() -> ProjectionInformation {
        ProjectionInformation::Open
    }

    fn from_proxy(proxy: ProjectionProxy) -> Self {
        Self(proxy)
    }
}

impl<S: DirectoryEntity> ResultType<S> for PersonView {
    fn shape() -> ResultShape<S, Self> {
        ResultShape::projection()
    }
}

/// Contact details built from a person.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactCard {
    pub cn: String,
    pub mail: Option<String>,
    pub sn: Option<String>,
}

impl Dto for ContactCard {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![
            Constructor::new(&["cn"], |args| {
                Ok(ContactCard {
                    cn: args.string("cn")?,
                    mail: None,
                    sn: None,
                })
            }),
            Constructor::new(&["cn", "mail"], |args| {
                Ok(ContactCard {
                    cn: args.string("cn")?,
                    mail: args.optional_string("mail"),
                    sn: None,
                })
            }),
        ]
    }

    fn settable_properties() -> &'static [&'static str] {
        &["sn"]
    }

    fn set_property(&mut self, name: &str, value: AttributeValue) -> DirectoryResult<()> {
        if name == "sn" {
            self.sn = value.to_strings().into_iter().next();
        }
        Ok(())
    }
}

impl ResultType<Person> for ContactCard {
    fn shape() -> ResultShape<Person, Self> {
        ResultShape::dto()
    }
}

/// Number of [`TrackedName`] values built so far.
pub static TRACKED_CONSTRUCTIONS: AtomicUsize = AtomicUsize::new(0);

/// A DTO counting its constructions.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedName(pub String);

impl Dto for TrackedName {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new(&["cn"], |args| {
            TRACKED_CONSTRUCTIONS.fetch_add(1, Ordering::SeqCst);
            Ok(TrackedName(args.string("cn")?))
        })]
    }
}

impl ResultType<Person> for TrackedName {
    fn shape() -> ResultShape<Person, Self> {
        ResultShape::dto()
    }
}

// =============================================================================
// Recording client
// =============================================================================

/// Client forwarding to an in-memory directory and recording each call.
#[derive(Debug, Default)]
pub struct RecordingClient {
    pub directory: InMemoryDirectory,
    calls: Mutex<Vec<String>>,
}

impl RecordingClient {
    pub fn new(directory: InMemoryDirectory) -> Self {
        Self {
            directory,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &str, dn: &Dn) {
        self.calls.lock().unwrap().push(format!("{call} {dn}"));
    }
}

#[async_trait]
impl DirectoryClient for RecordingClient {
    fn display_name(&self) -> &str {
        "recording"
    }

    async fn test_connection(&self) -> DirectoryResult<()> {
        Ok(())
    }

    async fn create(&self, entry: &DirectoryEntry) -> DirectoryResult<()> {
        self.record("create", &entry.dn);
        self.directory.create(entry).await
    }

    async fn update(&self, entry: &DirectoryEntry) -> DirectoryResult<()> {
        self.record("update", &entry.dn);
        self.directory.update(entry).await
    }

    async fn lookup(&self, dn: &Dn) -> DirectoryResult<DirectoryEntry> {
        self.record("lookup", dn);
        self.directory.lookup(dn).await
    }

    async fn search(
        &self,
        query: &LdapQuery,
        handler: &mut dyn SearchHandler,
    ) -> DirectoryResult<()> {
        self.record("search", &query.base);
        self.directory.search(query, handler).await
    }

    async fn unbind(&self, dn: &Dn) -> DirectoryResult<()> {
        self.record("unbind", dn);
        self.directory.unbind(dn).await
    }

    async fn delete(&self, entry: &DirectoryEntry) -> DirectoryResult<()> {
        self.record("delete", &entry.dn);
        self.directory.delete(entry).await
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub fn base_dn() -> Dn {
    Dn::parse("dc=example,dc=com").unwrap()
}

pub fn person_dn(cn: &str) -> Dn {
    Dn::parse(&format!("cn={cn},ou=people,dc=example,dc=com")).unwrap()
}

/// Directory entry for `person` at its computed name.
pub fn person_entry(person: &Person) -> DirectoryEntry {
    let mapper = ObjectDirectoryMapper::<Person>::new(base_dn());
    let dn = mapper.calculate_id(person).unwrap();
    mapper.to_entry(person, dn)
}

/// An entry of another type below the people base.
pub fn group_entry(cn: &str) -> DirectoryEntry {
    DirectoryEntry::new(
        Dn::parse(&format!("cn={cn},ou=people,dc=example,dc=com")).unwrap(),
        AttributeSet::new()
            .with("objectClass", vec!["top", "groupOfNames"])
            .with("cn", cn)
            .with("sn", "Doe"),
    )
}

/// People repositories over a recording in-memory directory.
pub struct TestFixture {
    pub client: Arc<RecordingClient>,
    pub people: PredicateRepository<Person>,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_entries(Vec::new())
    }

    /// Fixture whose directory holds `people`, in order.
    pub fn with_people(people: &[Person]) -> Self {
        Self::with_entries(people.iter().map(person_entry).collect())
    }

    pub fn with_entries(entries: Vec<DirectoryEntry>) -> Self {
        let client = Arc::new(RecordingClient::new(InMemoryDirectory::with_entries(
            entries,
        )));
        let repository = EntryRepository::<Person>::for_entity(client.clone(), base_dn());
        Self {
            people: PredicateRepository::for_repository(repository),
            client,
        }
    }

    pub fn repository(&self) -> &EntryRepository<Person> {
        self.people.repository()
    }

    pub fn directory(&self) -> &InMemoryDirectory {
        &self.client.directory
    }

    /// The most recent search.
    pub fn last_query(&self) -> LdapQuery {
        self.directory().last_query().expect("no search was run")
    }

    /// Roles repository sharing this fixture's client.
    pub fn roles(&self) -> EntryRepository<Role> {
        EntryRepository::for_entity(self.client.clone(), base_dn())
    }
}

/// John (employee 1), Jane (employee 2) and Bob Smith (employee 3).
pub fn sample_people() -> Vec<Person> {
    vec![
        Person::new("John", "Doe").with_employee_id(1),
        Person::new("Jane", "Doe").with_employee_id(2),
        Person::new("Bob", "Smith").with_employee_id(3),
    ]
}
