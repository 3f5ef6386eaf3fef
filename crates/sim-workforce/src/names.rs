//! Name, phone and email synthesis for newly hired consultants.
//!
//! Each business unit maps to a pool of locales; a hire draws a locale, then
//! a given and family name from that locale's table. Non-Latin-script
//! locales are stored already transliterated, so every generated name is
//! plain ASCII.

use sim_core::{ConsultantId, SimRng, UnitId};

const EMAIL_DOMAIN: &str = "fairviewadvisory.com";

struct LocalePool {
    given: &'static [&'static str],
    family: &'static [&'static str],
    /// `#` placeholders are replaced with random digits.
    phone_format: &'static str,
}

const EN_US: LocalePool = LocalePool {
    given: &[
        "James", "Mary", "Robert", "Patricia", "Michael", "Linda", "David", "Susan", "Sarah",
        "Thomas", "Karen", "Daniel",
    ],
    family: &[
        "Smith", "Johnson", "Williams", "Brown", "Jones", "Miller", "Davis", "Wilson", "Moore",
        "Taylor", "Anderson", "Clark",
    ],
    phone_format: "+1-###-###-####",
};

const EN_CA: LocalePool = LocalePool {
    given: &[
        "Liam", "Olivia", "Noah", "Emma", "Ethan", "Charlotte", "Lucas", "Amelia", "Owen",
        "Chloe",
    ],
    family: &[
        "Tremblay", "Roy", "Campbell", "Fraser", "Leblanc", "Macdonald", "Gagnon", "Stewart",
    ],
    phone_format: "+1-###-###-####",
};

const ES_MX: LocalePool = LocalePool {
    given: &[
        "Alejandro", "Sofia", "Diego", "Valentina", "Javier", "Camila", "Fernando", "Lucia",
        "Ricardo", "Mariana",
    ],
    family: &[
        "Garcia", "Hernandez", "Martinez", "Lopez", "Gonzalez", "Rodriguez", "Ramirez", "Torres",
    ],
    phone_format: "+52-##-####-####",
};

const PT_BR: LocalePool = LocalePool {
    given: &[
        "Joao", "Ana", "Pedro", "Beatriz", "Gabriel", "Larissa", "Rafael", "Juliana", "Felipe",
        "Camila",
    ],
    family: &[
        "Silva", "Santos", "Oliveira", "Souza", "Pereira", "Costa", "Almeida", "Carvalho",
    ],
    phone_format: "+55-##-####-####",
};

const ES_CO: LocalePool = LocalePool {
    given: &[
        "Andres", "Daniela", "Santiago", "Paula", "Carlos", "Natalia", "Juan", "Gabriela",
    ],
    family: &[
        "Moreno", "Jimenez", "Rojas", "Vargas", "Castro", "Ortiz", "Suarez", "Mejia",
    ],
    phone_format: "+57-###-###-####",
};

const EN_GB: LocalePool = LocalePool {
    given: &[
        "Oliver", "Amelia", "George", "Isla", "Harry", "Emily", "Jack", "Poppy", "Oscar",
        "Freya",
    ],
    family: &[
        "Walker", "Wright", "Green", "Hall", "Wood", "Harris", "Lewis", "Turner", "Baker",
    ],
    phone_format: "+44-####-######",
};

const DE_DE: LocalePool = LocalePool {
    given: &[
        "Lukas", "Hannah", "Felix", "Lena", "Maximilian", "Clara", "Jonas", "Marie", "Niklas",
        "Laura",
    ],
    family: &[
        "Mueller", "Schmidt", "Schneider", "Fischer", "Weber", "Wagner", "Becker", "Hoffmann",
    ],
    phone_format: "+49-###-#######",
};

const FR_FR: LocalePool = LocalePool {
    given: &[
        "Louis", "Camille", "Hugo", "Manon", "Arthur", "Chloe", "Jules", "Ines", "Leo", "Jade",
    ],
    family: &[
        "Bernard", "Dubois", "Moreau", "Laurent", "Lefevre", "Roux", "Fournier", "Girard",
    ],
    phone_format: "+33-#-##-##-##-##",
};

const ZH_CN: LocalePool = LocalePool {
    given: &["Wei", "Fang", "Lei", "Jing", "Ming", "Yan", "Hao", "Xiu", "Jun", "Li"],
    family: &["Wang", "Li", "Zhang", "Liu", "Chen", "Yang", "Huang", "Zhao", "Wu", "Zhou"],
    phone_format: "+86-###-####-####",
};

const JA_JP: LocalePool = LocalePool {
    given: &[
        "Haruto", "Yui", "Sota", "Aoi", "Ren", "Hina", "Kaito", "Sakura", "Riku", "Mio",
    ],
    family: &[
        "Sato", "Suzuki", "Takahashi", "Tanaka", "Watanabe", "Ito", "Yamamoto", "Nakamura",
    ],
    phone_format: "+81-##-####-####",
};

const KO_KR: LocalePool = LocalePool {
    given: &[
        "Minjun", "Seoyeon", "Jiho", "Hayoon", "Doyun", "Seoah", "Siwoo", "Jiwoo",
    ],
    family: &["Kim", "Lee", "Park", "Choi", "Jung", "Kang", "Cho", "Yoon"],
    phone_format: "+82-##-####-####",
};

const EN_AU: LocalePool = LocalePool {
    given: &[
        "Cooper", "Matilda", "Lachlan", "Ruby", "Flynn", "Evie", "Angus", "Willow",
    ],
    family: &[
        "Kelly", "Ryan", "Walsh", "Murphy", "Sullivan", "Bennett", "Hughes", "Marsh",
    ],
    phone_format: "+61-#-####-####",
};

/// Locale pools per business unit, mirroring the firm's regions.
fn pools_for_unit(unit: UnitId) -> &'static [&'static LocalePool] {
    match unit.0 {
        1 => &[&EN_US, &EN_CA],
        2 => &[&ES_MX, &PT_BR, &ES_CO],
        3 => &[&EN_GB, &DE_DE, &FR_FR],
        4 => &[&ZH_CN, &JA_JP, &KO_KR, &EN_AU],
        _ => &[&EN_US],
    }
}

/// A generated identity for a hire.
#[derive(Clone, Debug)]
pub struct Identity {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

/// Draw an identity for a hire into the given business unit.
pub fn generate_identity(unit: UnitId, rng: &mut SimRng) -> Identity {
    let pools = pools_for_unit(unit);
    let pool = *rng.choose(pools);
    Identity {
        first_name: (*rng.choose(pool.given)).to_string(),
        last_name: (*rng.choose(pool.family)).to_string(),
        phone: fill_phone(pool.phone_format, rng),
    }
}

fn fill_phone(format: &str, rng: &mut SimRng) -> String {
    format
        .chars()
        .map(|c| {
            if c == '#' {
                char::from_digit(rng.int_in_range(0, 9) as u32, 10).unwrap_or('0')
            } else {
                c
            }
        })
        .collect()
}

/// Company email: given-name initials + family name + id digits.
pub fn make_email(first_name: &str, last_name: &str, id: &ConsultantId) -> String {
    let initials: String = first_name
        .split_whitespace()
        .filter_map(|w| w.chars().next())
        .collect::<String>()
        .to_ascii_lowercase();
    let family = last_name.replace(' ', "").to_ascii_lowercase();
    let digits: String = id.0.chars().filter(|c| c.is_ascii_digit()).collect();
    format!("{initials}{family}{digits}@{EMAIL_DOMAIN}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identities_are_ascii() {
        let mut rng = SimRng::seed_from(42);
        for unit in 1..=4 {
            for _ in 0..20 {
                let id = generate_identity(UnitId(unit), &mut rng);
                assert!(id.first_name.is_ascii());
                assert!(id.last_name.is_ascii());
                assert!(id.phone.chars().all(|c| c.is_ascii_digit() || c == '+' || c == '-'));
            }
        }
    }

    #[test]
    fn email_shape() {
        let email = make_email("Mary Ann", "Van Dyke", &ConsultantId("C0042".into()));
        assert_eq!(email, "mavandyke0042@fairviewadvisory.com");
    }

    #[test]
    fn identity_draws_are_deterministic() {
        let a = generate_identity(UnitId(3), &mut SimRng::seed_from(5));
        let b = generate_identity(UnitId(3), &mut SimRng::seed_from(5));
        assert_eq!(a.first_name, b.first_name);
        assert_eq!(a.phone, b.phone);
    }
}
