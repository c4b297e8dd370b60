use strum::EnumIter;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, EnumIter, Default)]
pub enum Terrain {
    #[default]
    Empty,
    Water,
    Bridge,
    Fertile,
    Road,
    Grass,
    Dune,
    Sand,
    Snow,
}

impl Terrain {
    pub fn is_blocked(self) -> bool {
        matches!(self, Terrain::Water)
    }

    pub fn is_buildable(self) -> bool {
        matches!(
            self,
            Terrain::Empty
                | Terrain::Grass
                | Terrain::Sand
                | Terrain::Snow
                | Terrain::Dune
                | Terrain::Road
        )
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, EnumIter, Default)]
pub enum Biome {
    #[default]
    Plains,
    Forest,
    Desert,
    Tundra,
    Rocky,
}
