//! `#[serde(with = ...)]` helpers for shakmaty types in game records.

/// A [`Chess`](shakmaty::Chess) position as its FEN string.
pub mod position_serde {
    use std::str::FromStr;

    use serde::{
        de::{Error, Visitor},
        Deserializer, Serializer,
    };
    use shakmaty::{fen::Fen, CastlingMode, Chess, EnPassantMode};

    pub fn serialize<S: Serializer>(b: &Chess, ser: S) -> Result<S::Ok, S::Error> {
        let fen = Fen::from_position(b.clone(), EnPassantMode::Legal);
        ser.serialize_str(&fen.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Chess, D::Error> {
        struct ChessVisitor;
        impl<'de> Visitor<'de> for ChessVisitor {
            type Value = Chess;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(formatter, "a position in FEN")
            }

            fn visit_str<E: Error>(self, v: &str) -> Result<Self::Value, E> {
                Fen::from_str(v)
                    .map_err(|why| E::custom(format!("bad FEN `{v}`: {why}")))?
                    .into_position(CastlingMode::Standard)
                    .map_err(|why| E::custom(format!("FEN `{v}` is not a legal position: {why}")))
            }
        }
        d.deserialize_str(ChessVisitor)
    }
}

/// A move list as one space-separated string of UCI moves, the way the
/// `position ... moves` command spells it.
pub mod moves_serde {
    use std::str::FromStr;

    use serde::{
        de::{Error, Visitor},
        Deserializer, Serializer,
    };
    use shakmaty::uci::Uci;

    pub fn serialize<S: Serializer>(moves: &[Uci], ser: S) -> Result<S::Ok, S::Error> {
        let text = moves
            .iter()
            .map(Uci::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        ser.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Uci>, D::Error> {
        struct MovesVisitor;
        impl<'de> Visitor<'de> for MovesVisitor {
            type Value = Vec<Uci>;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(formatter, "space-separated moves in UCI notation")
            }

            fn visit_str<E: Error>(self, v: &str) -> Result<Self::Value, E> {
                v.split_whitespace()
                    .map(|m| Uci::from_str(m).map_err(|_| E::custom(format!("bad UCI move `{m}`"))))
                    .collect()
            }
        }
        d.deserialize_str(MovesVisitor)
    }
}
