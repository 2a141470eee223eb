//! Built-in francophone location catalog.
//!
//! Used when the `countries` / `cities` tables are unreachable or empty.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    pub country_code: String,
}

/// `(name, ISO code)`, in display order.
const COUNTRIES: &[(&str, &str)] = &[
    ("République Démocratique du Congo", "CD"),
    ("Cameroun", "CM"),
    ("Côte d'Ivoire", "CI"),
    ("Burkina Faso", "BF"),
    ("Mali", "ML"),
    ("Sénégal", "SN"),
    ("Niger", "NE"),
    ("Guinée", "GN"),
    ("Rwanda", "RW"),
    ("Burundi", "BI"),
    ("Tchad", "TD"),
    ("République Centrafricaine", "CF"),
    ("Gabon", "GA"),
    ("République du Congo", "CG"),
    ("Comores", "KM"),
    ("Djibouti", "DJ"),
    ("Madagascar", "MG"),
    ("Seychelles", "SC"),
    ("Bénin", "BJ"),
    ("Togo", "TG"),
    ("France", "FR"),
    ("Canada", "CA"),
    ("Belgique", "BE"),
    ("Suisse", "CH"),
];

/// `(name, country code)`; ten main cities for most countries, the capital for the rest.
const CITIES: &[(&str, &str)] = &[
    ("Kinshasa", "CD"),
    ("Lubumbashi", "CD"),
    ("Mbuji-Mayi", "CD"),
    ("Kisangani", "CD"),
    ("Bukavu", "CD"),
    ("Goma", "CD"),
    ("Kananga", "CD"),
    ("Likasi", "CD"),
    ("Kolwezi", "CD"),
    ("Matadi", "CD"),
    ("Yaoundé", "CM"),
    ("Douala", "CM"),
    ("Bamenda", "CM"),
    ("Bafoussam", "CM"),
    ("Garoua", "CM"),
    ("Maroua", "CM"),
    ("Ngaoundéré", "CM"),
    ("Bertoua", "CM"),
    ("Ebolowa", "CM"),
    ("Kumba", "CM"),
    ("Abidjan", "CI"),
    ("Yamoussoukro", "CI"),
    ("Bouaké", "CI"),
    ("Daloa", "CI"),
    ("San-Pédro", "CI"),
    ("Korhogo", "CI"),
    ("Man", "CI"),
    ("Divo", "CI"),
    ("Gagnoa", "CI"),
    ("Abengourou", "CI"),
    ("Ouagadougou", "BF"),
    ("Bobo-Dioulasso", "BF"),
    ("Koudougou", "BF"),
    ("Ouahigouya", "BF"),
    ("Banfora", "BF"),
    ("Kaya", "BF"),
    ("Tenkodogo", "BF"),
    ("Fada N'gourma", "BF"),
    ("Dori", "BF"),
    ("Gaoua", "BF"),
    ("Bamako", "ML"),
    ("Sikasso", "ML"),
    ("Mopti", "ML"),
    ("Koutiala", "ML"),
    ("Ségou", "ML"),
    ("Kayes", "ML"),
    ("Gao", "ML"),
    ("Tombouctou", "ML"),
    ("Kidal", "ML"),
    ("San", "ML"),
    ("Dakar", "SN"),
    ("Thiès", "SN"),
    ("Kaolack", "SN"),
    ("Saint-Louis", "SN"),
    ("Ziguinchor", "SN"),
    ("Diourbel", "SN"),
    ("Tambacounda", "SN"),
    ("Mbour", "SN"),
    ("Rufisque", "SN"),
    ("Kolda", "SN"),
    ("Niamey", "NE"),
    ("Zinder", "NE"),
    ("Maradi", "NE"),
    ("Agadez", "NE"),
    ("Tahoua", "NE"),
    ("Dosso", "NE"),
    ("Tillabéri", "NE"),
    ("Diffa", "NE"),
    ("Arlit", "NE"),
    ("Gaya", "NE"),
    ("Conakry", "GN"),
    ("Nzérékoré", "GN"),
    ("Kankan", "GN"),
    ("Kindia", "GN"),
    ("Labé", "GN"),
    ("Mamou", "GN"),
    ("Boké", "GN"),
    ("Faranah", "GN"),
    ("Kissidougou", "GN"),
    ("Guéckédou", "GN"),
    ("Kigali", "RW"),
    ("Butare", "RW"),
    ("Gitarama", "RW"),
    ("Ruhengeri", "RW"),
    ("Gisenyi", "RW"),
    ("Byumba", "RW"),
    ("Cyangugu", "RW"),
    ("Kibungo", "RW"),
    ("Kibuye", "RW"),
    ("Gikongoro", "RW"),
    ("Bujumbura", "BI"),
    ("Gitega", "BI"),
    ("Muyinga", "BI"),
    ("Ngozi", "BI"),
    ("Ruyigi", "BI"),
    ("Kayanza", "BI"),
    ("Cibitoke", "BI"),
    ("Bubanza", "BI"),
    ("Bururi", "BI"),
    ("Makamba", "BI"),
    ("N'Djamena", "TD"),
    ("Moundou", "TD"),
    ("Sarh", "TD"),
    ("Abéché", "TD"),
    ("Kelo", "TD"),
    ("Koumra", "TD"),
    ("Pala", "TD"),
    ("Am Timan", "TD"),
    ("Bongor", "TD"),
    ("Mongo", "TD"),
    ("Bangui", "CF"),
    ("Berbérati", "CF"),
    ("Carnot", "CF"),
    ("Bambari", "CF"),
    ("Bouar", "CF"),
    ("Bossangoa", "CF"),
    ("Bria", "CF"),
    ("Bangassou", "CF"),
    ("Nola", "CF"),
    ("Kaga-Bandoro", "CF"),
    ("Libreville", "GA"),
    ("Port-Gentil", "GA"),
    ("Franceville", "GA"),
    ("Oyem", "GA"),
    ("Moanda", "GA"),
    ("Mouila", "GA"),
    ("Lambaréné", "GA"),
    ("Tchibanga", "GA"),
    ("Koulamoutou", "GA"),
    ("Makokou", "GA"),
    ("Brazzaville", "CG"),
    ("Pointe-Noire", "CG"),
    ("Dolisie", "CG"),
    ("Nkayi", "CG"),
    ("Impfondo", "CG"),
    ("Ouesso", "CG"),
    ("Madingou", "CG"),
    ("Owando", "CG"),
    ("Sibiti", "CG"),
    ("Mossendjo", "CG"),
    ("Moroni", "KM"),
    ("Djibouti", "DJ"),
    ("Antananarivo", "MG"),
    ("Victoria", "SC"),
    ("Cotonou", "BJ"),
    ("Lomé", "TG"),
    ("Paris", "FR"),
    ("Montréal", "CA"),
    ("Bruxelles", "BE"),
    ("Genève", "CH"),
];

#[must_use]
pub fn fallback_countries() -> Vec<Country> {
    COUNTRIES
        .iter()
        .map(|(name, code)| Country { name: (*name).to_owned(), code: (*code).to_owned() })
        .collect()
}

/// Fallback cities of one country. Unknown codes yield an empty list.
#[must_use]
pub fn fallback_cities(country_code: &str) -> Vec<City> {
    let code = country_code.trim();
    CITIES
        .iter()
        .filter(|(_, c)| c.eq_ignore_ascii_case(code))
        .map(|(name, c)| City { name: (*name).to_owned(), country_code: (*c).to_owned() })
        .collect()
}

/// Display name for a country code, from the built-in list.
#[must_use]
pub fn country_name(code: &str) -> Option<&'static str> {
    let code = code.trim();
    COUNTRIES
        .iter()
        .find(|(_, c)| c.eq_ignore_ascii_case(code))
        .map(|(name, _)| *name)
}

#[cfg(test)]
#[path = "geo_test.rs"]
mod tests;
