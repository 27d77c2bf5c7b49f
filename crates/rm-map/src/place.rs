//! Place store: named points of interest grouped by square and layer.
//!
//! `place/bylayer` holds, for each square, `layers + 1` prefix offsets into
//! the place table; the places of layer `l` (1-based) in that square are
//! `index[l-1] .. index[l]`.  `place/bysquare` gives, per active square, where
//! its offsets start and how many layers it has.
//!
//! Names resolve through the `"city"` dictionary, opened the first time the
//! owning context is activated and kept for the context's lifetime.

use once_cell::unsync::OnceCell;

use bytes::Bytes;
use rm_core::{PlaceId, PointId, SquareId, StringId};

use crate::database::{MapDatabase, RawRange, Table};
use crate::dictionary::Dictionary;
use crate::square::{SquareRange, SquareTable};
use crate::{MapError, MapResult};

/// Dictionary holding place names.
pub const PLACE_DICTIONARY: &str = "city";

pub struct PlaceStore {
    places:     Table<i32>,
    names:      Table<u16>,
    by_layer:   Table<i32>,
    by_square:  Table<RawRange>,
    dictionary: OnceCell<Dictionary>,
    dict_data:  Bytes,
}

impl PlaceStore {
    pub fn map(db: &MapDatabase, squares: &SquareTable) -> MapResult<Self> {
        let places: Table<i32> = Table::open(db, "place/data")?;
        let names = Table::open_with_count(db, "place/name", places.count())?;
        Ok(Self {
            names,
            by_layer: Table::open(db, "place/bylayer")?,
            by_square: Table::open_with_count(db, "place/bysquare", squares.count())?,
            places,
            dictionary: OnceCell::new(),
            dict_data: Dictionary::section(db, PLACE_DICTIONARY)?.data().clone(),
        })
    }

    /// Open the name dictionary if this is the first activation.
    pub fn open_dictionary(&self) -> MapResult<&Dictionary> {
        self.dictionary
            .get_or_try_init(|| Dictionary::from_bytes(PLACE_DICTIONARY, &self.dict_data))
    }

    pub fn count(&self) -> usize {
        self.places.count()
    }

    /// Number of layers recorded for `square` (0 if the square is not active).
    pub fn layer_count(&self, squares: &SquareTable, square: SquareId) -> MapResult<u32> {
        match squares.square_index(square) {
            Some(index) => Ok(self.by_square.get(index)?.count.max(0) as u32),
            None => Ok(0),
        }
    }

    /// Places of `layer` (1-based) in `square`.
    pub fn in_square(&self, squares: &SquareTable, square: SquareId, layer: u32) -> MapResult<SquareRange> {
        let Some(index) = squares.square_index(square) else {
            return Ok(SquareRange::EMPTY);
        };
        let entry = self.by_square.get(index)?;
        if layer == 0 || entry.first < 0 || layer as i64 > entry.count as i64 {
            return Ok(SquareRange::EMPTY);
        }

        let base = entry.first as usize + layer as usize;
        let first = self.by_layer.get(base - 1)?;
        let end = self.by_layer.get(base)?;
        if first < 0 || end < first || end as usize > self.places.count() {
            log::error!("invalid place/bylayer offsets {first}..{end} in square {square}");
            return Err(MapError::out_of_range("place/bylayer", end, self.places.count()));
        }
        Ok(SquareRange::new(first as u32, (end - first) as u32))
    }

    /// Point at which `place` sits.
    pub fn point(&self, place: PlaceId) -> MapResult<PointId> {
        let raw = self.places.get(place.index())?;
        Ok(PointId::from_raw(raw as i64)?)
    }

    /// Name of `place`, or `None` if its string id is unknown.
    pub fn name(&self, place: PlaceId) -> MapResult<Option<&str>> {
        let id = StringId(self.names.get(place.index())?);
        Ok(self.open_dictionary()?.get(id))
    }
}
