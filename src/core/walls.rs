use serde::Serialize;

use super::types::{Mode, NextWall, WallId, WallRef};

pub const SOCIAL_106: u64 = 1_060_000;
pub const RESIDENT_110: u64 = 1_100_000;
pub const TAX_FUYOU_123: u64 = 1_230_000;
pub const SOCIAL_130: u64 = 1_300_000;
pub const SPOUSE_150: u64 = 1_500_000;
pub const TAX_160: u64 = 1_600_000;
pub const STUDENT_188: u64 = 1_880_000;
pub const SPOUSE_2016: u64 = 2_016_000;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct WallDefinition {
    pub id: WallId,
    pub label: &'static str,
    pub threshold: u64,
    /// `None` applies the wall to every mode.
    pub modes: Option<&'static [Mode]>,
}

impl WallDefinition {
    pub fn applies_to(&self, mode: Mode) -> bool {
        self.modes.is_none_or(|modes| modes.contains(&mode))
    }

    fn to_ref(&self) -> WallRef {
        WallRef {
            id: self.id,
            label: self.label,
        }
    }
}

/// Sorted ascending by threshold. `evaluate_walls` relies on the ordering.
pub static WALLS: [WallDefinition; 8] = [
    WallDefinition {
        id: WallId::Social106,
        label: "社保加入（特定適用）106万円",
        threshold: SOCIAL_106,
        modes: None,
    },
    WallDefinition {
        id: WallId::Resident110,
        label: "住民税（参考）110万円",
        threshold: RESIDENT_110,
        modes: None,
    },
    WallDefinition {
        id: WallId::TaxFuyou123,
        label: "配偶者控除（住民税）123万円",
        threshold: TAX_FUYOU_123,
        modes: None,
    },
    WallDefinition {
        id: WallId::Social130,
        label: "国民年金・健康保険 130万円",
        threshold: SOCIAL_130,
        modes: None,
    },
    WallDefinition {
        id: WallId::Spouse150,
        label: "配偶者控除 150万円",
        threshold: SPOUSE_150,
        modes: Some(&[Mode::Spouse]),
    },
    WallDefinition {
        id: WallId::Tax160,
        label: "所得税（概算）160万円",
        threshold: TAX_160,
        modes: None,
    },
    WallDefinition {
        id: WallId::Student188,
        label: "学生特例控除 188万円",
        threshold: STUDENT_188,
        modes: Some(&[Mode::Student]),
    },
    WallDefinition {
        id: WallId::Spouse2016,
        label: "配偶者特別控除終了 201.6万円",
        threshold: SPOUSE_2016,
        modes: Some(&[Mode::Spouse]),
    },
];

pub fn wall_definition(id: WallId) -> &'static WallDefinition {
    match id {
        WallId::Social106 => &WALLS[0],
        WallId::Resident110 => &WALLS[1],
        WallId::TaxFuyou123 => &WALLS[2],
        WallId::Social130 => &WALLS[3],
        WallId::Spouse150 => &WALLS[4],
        WallId::Tax160 => &WALLS[5],
        WallId::Student188 => &WALLS[6],
        WallId::Spouse2016 => &WALLS[7],
    }
}

pub fn evaluate_walls(mode: Mode, annual_income: u64) -> (Vec<WallRef>, Option<NextWall>) {
    let mut reached = Vec::new();
    let mut next = None;

    for wall in WALLS.iter().filter(|wall| wall.applies_to(mode)) {
        if annual_income >= wall.threshold {
            reached.push(wall.to_ref());
        } else if next.is_none() {
            next = Some(NextWall {
                id: wall.id,
                label: wall.label,
                amount: wall.threshold - annual_income,
            });
        }
    }

    (reached, next)
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct WallDetail {
    pub id: WallId,
    pub title: &'static str,
    pub description: &'static str,
    pub impact: &'static str,
    pub action: &'static str,
    pub merits: &'static [&'static str],
    pub demerits: &'static [&'static str],
}

static DETAILS: [WallDetail; 8] = [
    WallDetail {
        id: WallId::Social106,
        title: "社会保険 106 万円",
        description: "従業員 51 人以上の企業で週 20 時間以上勤務すると、106 万円で社会保険加入が必要になります。",
        impact: "厚生年金・健康保険料が控除されるため手取りが減少しますが、保障が安定します。",
        action: "加入後の保険料と将来の年金見込みを再確認し、勤務時間の調整や昇給額とのバランスを検討しましょう。",
        merits: &[
            "医療・年金の保障が充実する",
            "産休・育休などの制度を利用しやすくなる",
        ],
        demerits: &[
            "社会保険料の負担が発生し手取りが減る",
            "扶養から外れる場合は家計管理を見直す必要がある",
        ],
    },
    WallDetail {
        id: WallId::Resident110,
        title: "住民税 110 万円",
        description: "年間所得が 110 万円を超えると住民税（均等割・所得割）が課税されます。",
        impact: "翌年の住民税が天引きされ、可処分所得が減少します。",
        action: "自治体の非課税枠を調べ、控除証明書の提出やふるさと納税の活用を検討しましょう。",
        merits: &["課税所得が発生し、社会保険加入の可能性が広がる"],
        demerits: &["住民税が翌年にまとめて請求される可能性がある"],
    },
    WallDetail {
        id: WallId::TaxFuyou123,
        title: "扶養控除（住民税）123 万円",
        description: "住民税の配偶者控除を維持するには年間所得 123 万円以下に抑える必要があります。",
        impact: "控除が外れると世帯全体の税負担が増える場合があります。",
        action: "年末時点の見込みを確認し、賞与や交通費の扱いを早めに調整しましょう。",
        merits: &["働き方の自由度が上がり将来の昇給に繋がる"],
        demerits: &["扶養控除の適用外となり世帯課税が増加"],
    },
    WallDetail {
        id: WallId::Social130,
        title: "社会保険 130 万円",
        description: "一般的な扶養範囲を超えると被扶養者から外れ、自分で社会保険料を負担します。",
        impact: "国民年金・国民健康保険料の支払いが発生し、年間の手取りが大きく変動します。",
        action: "収支シミュレーションを行い、月収と就業時間を調整して負担増に備えましょう。",
        merits: &["社会保障の加入実績が増え将来の年金額が上がる"],
        demerits: &["保険料負担が重くなる", "扶養控除の適用が外れる"],
    },
    WallDetail {
        id: WallId::Spouse150,
        title: "配偶者控除 150 万円",
        description: "配偶者控除の満額適用は 150 万円まで。これを超えると段階的に控除額が減ります。",
        impact: "世帯の所得税・住民税が増えるため、配偶者の収入増加分と効果を比較する必要があります。",
        action: "控除縮小を前提に家計を試算し、必要に応じて iDeCo や保険料控除を活用しましょう。",
        merits: &["昇給・賞与を取り込みやすくなる"],
        demerits: &["控除減少により世帯課税が増える"],
    },
    WallDetail {
        id: WallId::Tax160,
        title: "所得税（概算）160 万円",
        description: "課税所得が増え、源泉所得税が発生します。源泉徴収票を確認し確定申告が必要な場合があります。",
        impact: "所得税 5%（概算）が控除されるため、手取りが減少します。",
        action: "年末調整の控除証明書を整理し、医療費控除などの適用可否を確認しましょう。",
        merits: &["社会保険・税金を納めることで信用情報が蓄積する"],
        demerits: &["確定申告の手間が増える"],
    },
    WallDetail {
        id: WallId::Student188,
        title: "学生特例控除 188 万円",
        description: "特定扶養控除の上限。超えると親の税額が増える可能性があります。",
        impact: "扶養から外れることで学費や家計への負担が増える場合があります。",
        action: "月次のシフト管理を行い、交通費や賞与の扱いを含めて家族と共有しましょう。",
        merits: &["高収入のアルバイト経験でキャリア形成に繋がる"],
        demerits: &["親の税負担が増える可能性がある"],
    },
    WallDetail {
        id: WallId::Spouse2016,
        title: "配偶者特別控除終了 201.6 万円",
        description: "201.6 万円を超えると配偶者特別控除がゼロになります。",
        impact: "世帯税額が最も増えやすいゾーンのため注意が必要です。",
        action: "就業調整か、共働き前提の家計設計へ転換するかを検討しましょう。",
        merits: &["フルタイム化による社会保障・昇給の期待"],
        demerits: &["控除がなくなるため世帯課税が大きく増える"],
    },
];

pub fn wall_detail(id: WallId) -> &'static WallDetail {
    match id {
        WallId::Social106 => &DETAILS[0],
        WallId::Resident110 => &DETAILS[1],
        WallId::TaxFuyou123 => &DETAILS[2],
        WallId::Social130 => &DETAILS[3],
        WallId::Spouse150 => &DETAILS[4],
        WallId::Tax160 => &DETAILS[5],
        WallId::Student188 => &DETAILS[6],
        WallId::Spouse2016 => &DETAILS[7],
    }
}

pub fn wall_merits(ids: &[WallId]) -> Vec<&'static str> {
    ids.iter()
        .flat_map(|id| wall_detail(*id).merits.iter().copied())
        .collect()
}

pub fn wall_demerits(ids: &[WallId]) -> Vec<&'static str> {
    ids.iter()
        .flat_map(|id| wall_detail(*id).demerits.iter().copied())
        .collect()
}
