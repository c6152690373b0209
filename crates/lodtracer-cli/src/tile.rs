use std::ops::Range;

use glam::UVec2;
use rayon::iter::plumbing::bridge;

/// Half open rectangle of pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub start: UVec2,
    pub end: UVec2,
}

impl Tile {
    pub fn size(&self) -> UVec2 {
        self.end - self.start
    }

    pub fn len(&self) -> usize {
        let size = self.size();
        (size.x * size.y) as usize
    }

    pub fn pixels(self) -> impl Iterator<Item = UVec2> {
        let width = self.size().x;
        (0..self.len() as u32).map(move |i| self.start + UVec2::new(i % width, i / width))
    }
}

/// Splits a pixel rectangle into tiles of at most `grainsize` pixels a side, row by row.
#[derive(Debug, Clone, Copy)]
pub struct Tiler {
    pub start: UVec2,
    pub end: UVec2,
    pub grainsize: u32,
}

impl Tiler {
    pub fn new(x: Range<u32>, y: Range<u32>, grainsize: u32) -> Self {
        Self {
            start: UVec2::new(x.start, y.start),
            end: UVec2::new(x.end.max(x.start), y.end.max(y.start)),
            grainsize: grainsize.max(1),
        }
    }

    /// Tiles per row and per column
    pub fn grid(&self) -> UVec2 {
        (self.end - self.start + UVec2::splat(self.grainsize - 1)) / self.grainsize
    }

    pub fn tile_count(&self) -> usize {
        let grid = self.grid();
        (grid.x * grid.y) as usize
    }

    pub fn pixel_count(&self) -> usize {
        let size = self.end - self.start;
        (size.x * size.y) as usize
    }

    pub fn tile(&self, idx: usize) -> Option<Tile> {
        if idx >= self.tile_count() {
            return None;
        }

        let columns = self.grid().x;
        let cell = UVec2::new(idx as u32 % columns, idx as u32 / columns);
        let start = self.start + cell * self.grainsize;
        Some(Tile {
            start,
            end: (start + UVec2::splat(self.grainsize)).min(self.end),
        })
    }
}

impl IntoIterator for Tiler {
    type Item = Tile;

    type IntoIter = TileIterator;

    fn into_iter(self) -> Self::IntoIter {
        TileIterator {
            tiler: self,
            start: 0,
            end: self.tile_count(),
        }
    }
}

pub struct TileIterator {
    tiler: Tiler,
    start: usize,
    end: usize,
}

impl ExactSizeIterator for TileIterator {}

impl DoubleEndedIterator for TileIterator {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.start == self.end {
            return None;
        }
        self.end -= 1;
        self.tiler.tile(self.end)
    }
}

impl Iterator for TileIterator {
    type Item = Tile;

    fn next(&mut self) -> Option<Self::Item> {
        if self.start == self.end {
            return None;
        }
        let tile = self.tiler.tile(self.start);
        self.start += 1;
        tile
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.end - self.start;
        (len, Some(len))
    }
}

pub struct TileParallelIterator {
    base: Tiler,
}

pub struct TileProducer {
    base: TileIterator,
}

impl rayon::iter::IntoParallelIterator for Tiler {
    type Iter = TileParallelIterator;
    type Item = Tile;

    fn into_par_iter(self) -> Self::Iter {
        Self::Iter { base: self }
    }
}

impl rayon::iter::ParallelIterator for TileParallelIterator {
    type Item = Tile;

    fn drive_unindexed<C>(self, consumer: C) -> C::Result
    where
        C: rayon::iter::plumbing::UnindexedConsumer<Self::Item>,
    {
        bridge(self, consumer)
    }

    fn opt_len(&self) -> Option<usize> {
        Some(self.base.tile_count())
    }
}

impl rayon::iter::IndexedParallelIterator for TileParallelIterator {
    fn len(&self) -> usize {
        self.base.tile_count()
    }

    fn drive<C: rayon::iter::plumbing::Consumer<Self::Item>>(self, consumer: C) -> C::Result {
        bridge(self, consumer)
    }

    fn with_producer<CB: rayon::iter::plumbing::ProducerCallback<Self::Item>>(
        self,
        callback: CB,
    ) -> CB::Output {
        callback.callback(TileProducer {
            base: self.base.into_iter(),
        })
    }
}

impl rayon::iter::plumbing::Producer for TileProducer {
    type Item = Tile;
    type IntoIter = TileIterator;

    fn into_iter(self) -> Self::IntoIter {
        self.base
    }

    fn split_at(self, index: usize) -> (Self, Self) {
        let TileIterator { tiler, start, end } = self.base;
        (
            Self {
                base: TileIterator {
                    tiler,
                    start,
                    end: start + index,
                },
            },
            Self {
                base: TileIterator {
                    tiler,
                    start: start + index,
                    end,
                },
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use glam::UVec2;
    use rayon::prelude::*;

    use super::Tiler;

    #[test]
    fn tiles_cover_every_pixel_once() {
        let tiler = Tiler::new(0..37, 0..20, 8);
        assert_eq!(tiler.grid(), UVec2::new(5, 3));
        assert_eq!(tiler.tile_count(), 15);

        let pixels: Vec<UVec2> = tiler.into_iter().flat_map(|tile| tile.pixels()).collect();
        assert_eq!(pixels.len(), tiler.pixel_count());
        let unique: HashSet<_> = pixels.iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(unique.len(), 37 * 20);
        assert!(pixels.iter().all(|p| p.x < 37 && p.y < 20));
    }

    #[test]
    fn offset_range() {
        let tiler = Tiler::new(3..5, 10..11, 32);
        let tiles: Vec<_> = tiler.into_iter().collect();
        assert_eq!(tiles.len(), 1);
        let pixels: Vec<_> = tiles[0].pixels().collect();
        assert_eq!(pixels, vec![UVec2::new(3, 10), UVec2::new(4, 10)]);
    }

    #[test]
    fn parallel_matches_sequential() {
        let tiler = Tiler::new(0..100, 0..70, 16);
        let sequential: Vec<_> = tiler.into_iter().collect();
        let parallel: Vec<_> = tiler.into_par_iter().collect();
        assert_eq!(sequential, parallel);
        assert_eq!(tiler.into_iter().rev().count(), sequential.len());
    }

    #[test]
    fn empty_range() {
        let tiler = Tiler::new(5..5, 0..10, 4);
        assert_eq!(tiler.tile_count(), 0);
        assert_eq!(tiler.into_iter().count(), 0);
    }
}
