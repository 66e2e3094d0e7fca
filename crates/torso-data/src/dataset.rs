//! CSV readers and writers for the position and personnel datasets.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};
use torso_core::{
    validate_performance, Ledger, Paygrade, Person, PersonId, Position, PositionId, Rating, Status,
    ValidationError,
};

use crate::{Dataset, LoadError};

#[derive(Debug, Deserialize)]
struct PositionRow {
    id: String,
    required_rating: String,
    required_paygrade: String,
    location_tag: String,
    #[serde(default)]
    billet_type: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PersonRow {
    id: String,
    rating: String,
    paygrade: String,
    time_in_service: String,
    performance_score: String,
    status: String,
    #[serde(default)]
    time_in_grade: Option<String>,
    #[serde(default)]
    position_id: Option<String>,
    #[serde(default)]
    tour_ticks: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Serialize)]
struct PositionOut<'a> {
    id: &'a str,
    required_rating: &'a str,
    required_paygrade: String,
    location_tag: &'a str,
    billet_type: Option<&'a str>,
    title: Option<&'a str>,
}

#[derive(Serialize)]
struct PersonOut<'a> {
    id: u64,
    rating: &'a str,
    paygrade: String,
    time_in_service: u32,
    performance_score: Decimal,
    status: &'static str,
    time_in_grade: u32,
    position_id: Option<&'a str>,
    tour_ticks: u32,
    name: Option<&'a str>,
}

fn reader<R: io::Read>(rdr: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(rdr)
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn create(path: &Path) -> Result<File, LoadError> {
    File::create(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Blank optional cells count as absent.
fn present(cell: Option<String>) -> Option<String> {
    cell.filter(|s| !s.trim().is_empty())
}

/// Field-level parsing for one record, with the line fixed.
struct Cells {
    dataset: Dataset,
    line: u64,
}

impl Cells {
    fn fail(&self, reason: impl Into<String>) -> LoadError {
        LoadError::malformed(self.dataset, self.line, reason)
    }

    fn required<'a>(&self, field: &str, value: &'a str) -> Result<&'a str, LoadError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(self.fail(format!("missing required field `{field}`")));
        }
        Ok(value)
    }

    /// A tick count: an integer that must not be negative.
    fn ticks(&self, field: &str, value: &str) -> Result<u32, LoadError> {
        let value = self.required(field, value)?;
        let n: i64 = value
            .parse()
            .map_err(|_| self.fail(format!("`{field}` is not a whole number: {value:?}")))?;
        if n < 0 {
            return Err(self.fail(format!("negative `{field}`: {n}")));
        }
        u32::try_from(n).map_err(|_| self.fail(format!("`{field}` is too large: {n}")))
    }

    fn parse<T>(&self, field: &str, value: &str) -> Result<T, LoadError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let value = self.required(field, value)?;
        value.parse().map_err(|e| self.fail(format!("`{field}`: {e}")))
    }
}

fn line_of(record: &csv::StringRecord) -> u64 {
    record.position().map_or(0, |p| p.line())
}

/// Read the position dataset.
pub fn read_positions<R: io::Read>(rdr: R) -> Result<Vec<Position>, LoadError> {
    let dataset = Dataset::Positions;
    let mut rdr = reader(rdr);
    let headers = rdr
        .headers()
        .map_err(|e| LoadError::from_csv(dataset, e))?
        .clone();
    let mut seen: BTreeMap<PositionId, u64> = BTreeMap::new();
    let mut out = Vec::new();
    let mut record = csv::StringRecord::new();
    while rdr
        .read_record(&mut record)
        .map_err(|e| LoadError::from_csv(dataset, e))?
    {
        let line = line_of(&record);
        let row: PositionRow = record
            .deserialize(Some(&headers))
            .map_err(|e| LoadError::from_csv(dataset, e))?;
        let cells = Cells { dataset, line };

        let id = PositionId(cells.required("id", &row.id)?.to_string());
        let rating = Rating::parse(cells.required("required_rating", &row.required_rating)?)
            .map_err(|e| cells.fail(e.to_string()))?;
        let paygrade: Paygrade = cells.parse("required_paygrade", &row.required_paygrade)?;
        let location = cells.required("location_tag", &row.location_tag)?;

        match seen.entry(id.clone()) {
            Entry::Occupied(e) => {
                return Err(cells.fail(format!("duplicate position id {id} (first seen at line {})", e.get())))
            }
            Entry::Vacant(e) => {
                e.insert(line);
            }
        }

        let mut pos = Position::new(id, rating, paygrade, location);
        pos.billet_type = present(row.billet_type);
        pos.title = present(row.title);
        out.push(pos);
    }
    debug!(count = out.len(), "read positions");
    Ok(out)
}

/// Read the position dataset from a file.
pub fn read_positions_path(path: &Path) -> Result<Vec<Position>, LoadError> {
    read_positions(open(path)?)
}

fn parse_person(cells: &Cells, row: PersonRow) -> Result<Person, LoadError> {
    let id: u64 = cells.parse("id", &row.id)?;
    if id == u64::MAX {
        return Err(cells.fail(format!("person id {id} leaves no room for new ids")));
    }
    let rating = Rating::parse(cells.required("rating", &row.rating)?)
        .map_err(|e| cells.fail(e.to_string()))?;
    let paygrade: Paygrade = cells.parse("paygrade", &row.paygrade)?;
    let time_in_service = cells.ticks("time_in_service", &row.time_in_service)?;
    let performance: Decimal = cells.parse("performance_score", &row.performance_score)?;
    validate_performance(performance).map_err(|e| cells.fail(e.to_string()))?;
    let status: Status = cells.parse("status", &row.status)?;

    let time_in_grade = match present(row.time_in_grade) {
        Some(v) => cells.ticks("time_in_grade", &v)?,
        None => time_in_service,
    };
    let tour_ticks = match present(row.tour_ticks) {
        Some(v) => cells.ticks("tour_ticks", &v)?,
        None => 0,
    };

    let mut person = Person::new(PersonId(id), rating, paygrade, performance);
    person.time_in_service = time_in_service;
    person.time_in_grade = time_in_grade;
    person.status = status;
    person.position = present(row.position_id).map(|p| PositionId(p.trim().to_string()));
    person.tour_ticks = tour_ticks;
    person.name = present(row.name);
    person.validate().map_err(|e| match e {
        ValidationError::StatusMismatch(_, Status::Assigned) => {
            cells.fail("status assigned requires a `position_id`")
        }
        ValidationError::StatusMismatch(_, status) => {
            cells.fail(format!("`position_id` given for a person with status {status}"))
        }
        other => cells.fail(other.to_string()),
    })?;
    Ok(person)
}

/// Read the personnel dataset, keeping each record's line number.
fn read_people_lines<R: io::Read>(rdr: R) -> Result<Vec<(u64, Person)>, LoadError> {
    let dataset = Dataset::Personnel;
    let mut rdr = reader(rdr);
    let headers = rdr
        .headers()
        .map_err(|e| LoadError::from_csv(dataset, e))?
        .clone();
    let mut seen: BTreeMap<PersonId, u64> = BTreeMap::new();
    let mut out = Vec::new();
    let mut record = csv::StringRecord::new();
    while rdr
        .read_record(&mut record)
        .map_err(|e| LoadError::from_csv(dataset, e))?
    {
        let line = line_of(&record);
        let row: PersonRow = record
            .deserialize(Some(&headers))
            .map_err(|e| LoadError::from_csv(dataset, e))?;
        let cells = Cells { dataset, line };
        let person = parse_person(&cells, row)?;
        if let Some(first) = seen.insert(person.id, line) {
            return Err(cells.fail(format!(
                "duplicate person id {} (first seen at line {first})",
                person.id
            )));
        }
        out.push((line, person));
    }
    debug!(count = out.len(), "read personnel");
    Ok(out)
}

/// Read the personnel dataset.
pub fn read_people<R: io::Read>(rdr: R) -> Result<Vec<Person>, LoadError> {
    Ok(read_people_lines(rdr)?.into_iter().map(|(_, p)| p).collect())
}

/// Cross-check assignments against positions and build the ledger.
///
/// `people` carries the dataset line of each record so that a bad
/// assignment is reported against the person who claims it.
pub fn assemble_ledger(
    positions: Vec<Position>,
    people: Vec<(u64, Person)>,
) -> Result<Ledger, LoadError> {
    let by_id: BTreeMap<&PositionId, &Position> = positions.iter().map(|p| (&p.id, p)).collect();
    let mut holders: BTreeMap<&PositionId, PersonId> = BTreeMap::new();
    for (line, person) in &people {
        let Some(pid) = &person.position else {
            continue;
        };
        let fail = |reason: String| LoadError::malformed(Dataset::Personnel, *line, reason);
        let pos = by_id
            .get(pid)
            .ok_or_else(|| fail(format!("person {} is assigned to unknown position {pid}", person.id)))?;
        if let Some(first) = holders.insert(pid, person.id) {
            return Err(fail(format!("position {pid} is already held by person {first}")));
        }
        if !pos.accepts(person) {
            return Err(fail(format!(
                "person {} ({} {}) does not match position {pid} ({} {})",
                person.id, person.rating, person.paygrade, pos.rating, pos.paygrade
            )));
        }
    }
    let ledger = Ledger::new(positions, people.into_iter().map(|(_, p)| p).collect())?;
    Ok(ledger)
}

/// Load both datasets and build the starting ledger.
pub fn load_ledger(positions: &Path, personnel: &Path) -> Result<Ledger, LoadError> {
    let pos = read_positions_path(positions)?;
    let people = read_people_lines(open(personnel)?)?;
    let ledger = assemble_ledger(pos, people)?;
    info!(
        positions = ledger.positions().count(),
        people = ledger.people().count(),
        vacant = ledger.vacant_positions().count(),
        "datasets loaded"
    );
    Ok(ledger)
}

/// Write positions in the dataset format.
pub fn write_positions<'a, W, I>(w: W, positions: I) -> Result<(), LoadError>
where
    W: io::Write,
    I: IntoIterator<Item = &'a Position>,
{
    let dataset = Dataset::Positions;
    let mut wtr = csv::Writer::from_writer(w);
    for pos in positions {
        wtr.serialize(PositionOut {
            id: &pos.id.0,
            required_rating: pos.rating.as_str(),
            required_paygrade: pos.paygrade.to_string(),
            location_tag: &pos.location,
            billet_type: pos.billet_type.as_deref(),
            title: pos.title.as_deref(),
        })
        .map_err(|source| LoadError::Csv { dataset, source })?;
    }
    wtr.flush().map_err(|source| LoadError::Csv {
        dataset,
        source: source.into(),
    })
}

/// Write positions to a file.
pub fn write_positions_path<'a, I>(path: &Path, positions: I) -> Result<(), LoadError>
where
    I: IntoIterator<Item = &'a Position>,
{
    write_positions(create(path)?, positions)
}

/// Write people in the dataset format. Terminal records are written too.
pub fn write_people<'a, W, I>(w: W, people: I) -> Result<(), LoadError>
where
    W: io::Write,
    I: IntoIterator<Item = &'a Person>,
{
    let dataset = Dataset::Personnel;
    let mut wtr = csv::Writer::from_writer(w);
    for p in people {
        wtr.serialize(PersonOut {
            id: p.id.0,
            rating: p.rating.as_str(),
            paygrade: p.paygrade.to_string(),
            time_in_service: p.time_in_service,
            performance_score: p.performance,
            status: p.status.as_str(),
            time_in_grade: p.time_in_grade,
            position_id: p.position.as_ref().map(|id| id.0.as_str()),
            tour_ticks: p.tour_ticks,
            name: p.name.as_deref(),
        })
        .map_err(|source| LoadError::Csv { dataset, source })?;
    }
    wtr.flush().map_err(|source| LoadError::Csv {
        dataset,
        source: source.into(),
    })
}

/// Write people to a file.
pub fn write_people_path<'a, I>(path: &Path, people: I) -> Result<(), LoadError>
where
    I: IntoIterator<Item = &'a Person>,
{
    write_people(create(path)?, people)
}
