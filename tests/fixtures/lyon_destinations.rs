//! Real Lyon addresses and coordinates for planning tests.

use delivery_planner::model::{Coordinate, Depot, Destination, DestinationId, PostalAddress};

pub fn depot() -> Depot {
    Depot::new(
        "Entrepot Gerland",
        PostalAddress::new("10 Allee Pierre de Coubertin", "69007", "Lyon", "France"),
        Coordinate::new(4.8320, 45.7280),
    )
}

/// Croix-Rousse bakery, already geocoded.
pub fn bakery() -> Destination {
    Destination::new(
        DestinationId(101),
        "Boulangerie des Pentes",
        PostalAddress::new("4 Rue des Capucins", "69001", "Lyon", "France"),
    )
    .with_coordinate(Coordinate::new(4.8335, 45.7690))
}

/// Presqu'ile florist, already geocoded.
pub fn florist() -> Destination {
    Destination::new(
        DestinationId(102),
        "Fleurs Bellecour",
        PostalAddress::new("18 Place Bellecour", "69002", "Lyon", "France"),
    )
    .with_coordinate(Coordinate::new(4.8322, 45.7578))
}

/// Part-Dieu bookshop, already geocoded.
pub fn bookshop() -> Destination {
    Destination::new(
        DestinationId(103),
        "Librairie Garibaldi",
        PostalAddress::new("77 Rue Garibaldi", "69003", "Lyon", "France"),
    )
    .with_coordinate(Coordinate::new(4.8512, 45.7640))
}

/// Destination whose address no provider will ever resolve.
pub fn unresolvable() -> Destination {
    Destination::new(
        DestinationId(999),
        "Ghost Warehouse",
        PostalAddress::new("1 Impasse Inconnue", "00000", "Nulleville", "France"),
    )
}
