use crate::module::term::model::{PartySnapshot, TermRecord};
use crate::module::term::schema::TermKind;
use chrono::DateTime;

pub const LINES_PER_PAGE: usize = 50;
pub const PAGE_SEPARATOR: char = '\x0C';
const LINE_WIDTH: usize = 90;
const NOT_APPLICABLE: &str = "Nao se aplica";

#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub file_name: String,
    pub content_type: &'static str,
    pub pages: Vec<String>,
}

impl RenderedDocument {
    pub fn content(&self) -> String {
        self.pages.join(&PAGE_SEPARATOR.to_string())
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

pub fn file_name(kind: TermKind, term_id: i64) -> String {
    format!("termo-{}-{term_id}.txt", kind.as_str())
}

/// Renders the term as paginated text. Section order is fixed: header, pet,
/// donor, adopter, commitments, observations, signature.
pub fn render_term(term: &TermRecord) -> RenderedDocument {
    let mut body = Vec::new();
    header(&mut body, term);
    pet_section(&mut body, term);
    party_section(&mut body, "DADOS DO DOADOR", Some(&term.donor));
    party_section(&mut body, "DADOS DO ADOTANTE", term.adopter.as_ref());
    commitments_section(&mut body, term.kind);
    observations_section(&mut body, term.observations.as_deref());
    signature_section(&mut body, term);

    let chunks = body.chunks(LINES_PER_PAGE).collect::<Vec<_>>();
    let total = chunks.len();
    let pages = chunks
        .into_iter()
        .enumerate()
        .map(|(idx, lines)| {
            let mut page = lines.join("\n");
            page.push_str("\n\n");
            page.push_str(&format!(
                "Pagina {} de {total} | Hash de integridade: {}\n",
                idx + 1,
                term.integrity_hash
            ));
            page
        })
        .collect();

    RenderedDocument {
        file_name: file_name(term.kind, term.id),
        content_type: "text/plain; charset=utf-8",
        pages,
    }
}

pub fn format_signed_at(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.format("%d/%m/%Y %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn header(out: &mut Vec<String>, term: &TermRecord) {
    out.push(term.kind.title().to_string());
    out.push(format!("Termo n. {} ({})", term.id, term.kind.as_str()));
    out.push(format!("Assinado em {}", format_signed_at(term.signed_at)));
    out.push(String::new());
}

fn pet_section(out: &mut Vec<String>, term: &TermRecord) {
    out.push("DADOS DO ANIMAL".to_string());
    match &term.pet {
        Some(pet) => {
            out.push(field("Nome", &pet.name));
            out.push(field("Especie", opt(&pet.species)));
            out.push(field("Raca", opt(&pet.breed)));
            out.push(field("Idade", &format!("{} ano(s)", pet.age)));
            out.push(field("Sexo", opt(&pet.sex)));
            if term.kind == TermKind::Donation {
                wrap_into(out, &field("Motivo da doacao", opt(&pet.donation_reason)));
            }
        }
        None => out.push(format!("  {NOT_APPLICABLE}")),
    }
    out.push(String::new());
}

fn party_section(out: &mut Vec<String>, title: &str, party: Option<&PartySnapshot>) {
    out.push(title.to_string());
    match party {
        Some(p) => {
            out.push(field("Nome", &p.name));
            out.push(field(p.document_type.label(), &p.document_number));
            out.push(field("E-mail", &p.email));
            out.push(field("Telefone", &p.phone));
            out.push(field("Cidade", opt(&p.city)));
            out.push(field("Estado", opt(&p.state)));
        }
        None => out.push(format!("  {NOT_APPLICABLE}")),
    }
    out.push(String::new());
}

fn commitments_section(out: &mut Vec<String>, kind: TermKind) {
    out.push("COMPROMISSOS".to_string());
    let items: &[&str] = match kind {
        TermKind::Adoption | TermKind::Compromise => &[
            "Oferecer alimentacao adequada, agua limpa e abrigo.",
            "Manter a vacinacao e a vermifugacao em dia.",
            "Levar o animal ao veterinario sempre que necessario.",
            "Nao abandonar, vender ou repassar o animal a terceiros.",
            "Permitir o acompanhamento pos-adocao pelo doador.",
            "Comunicar o doador em caso de fuga, doenca grave ou obito.",
        ],
        TermKind::Donation => &[
            "Declarar que o animal esta sob minha guarda legitima.",
            "Informar com veracidade o estado de saude do animal.",
            "Entregar o animal somente ao adotante registrado na plataforma.",
        ],
    };
    for item in items {
        wrap_into(out, &format!("  [x] {item}"));
    }
    out.push(String::new());
}

fn observations_section(out: &mut Vec<String>, observations: Option<&str>) {
    out.push("OBSERVACOES".to_string());
    match observations {
        Some(text) => {
            for paragraph in text.lines() {
                wrap_into(out, &format!("  {paragraph}"));
            }
        }
        None => out.push("  Nenhuma".to_string()),
    }
    out.push(String::new());
}

fn signature_section(out: &mut Vec<String>, term: &TermRecord) {
    out.push("ASSINATURA DIGITAL".to_string());
    wrap_into(out, &field("Assinatura", &term.digital_signature));
    out.push(field("Data", &format_signed_at(term.signed_at)));
    out.push(field("Hash", &term.integrity_hash));
    out.push(field("Resumo do registro", &term.snapshot_digest));
}

fn field(label: &str, value: &str) -> String {
    format!("  {label}: {value}")
}

fn opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}

/// Greedy word wrap at `LINE_WIDTH` characters.
fn wrap_into(out: &mut Vec<String>, line: &str) {
    if line.chars().count() <= LINE_WIDTH {
        out.push(line.to_string());
        return;
    }
    let mut current = String::new();
    for word in line.split(' ') {
        let extra = if current.is_empty() { 0 } else { 1 };
        if !current.is_empty() && current.chars().count() + extra + word.chars().count() > LINE_WIDTH {
            out.push(std::mem::take(&mut current));
            current.push_str("    ");
        } else if extra == 1 {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.trim().is_empty() {
        out.push(current);
    }
}
