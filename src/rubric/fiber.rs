use super::StepDefinition;

struct FiberStep {
    name: &'static str,
    instruction: &'static str,
    criteria: &'static [&'static str],
}

const FIBER_STEPS: [FiberStep; 12] = [
    FiberStep {
        name: "House Photo",
        instruction: "Take a photo of the HOUSE from the street. Make sure you can see the house number if possible.",
        criteria: &[
            "House/building clearly visible and identifiable",
            "Street number visible if present (not required)",
        ],
    },
    FiberStep {
        name: "Cable from Pole to House",
        instruction: "Take a WIDE photo showing the cable going from the telephone pole to the house. Step back so you can see both ends.",
        criteria: &[
            "Wide shot showing full cable span from pole to pigtail screw",
            "Full span clearly visible in single frame",
            "Connection points identifiable at both ends",
        ],
    },
    FiberStep {
        name: "Cable Entry Point (Outside)",
        instruction: "Take a CLOSE-UP photo of where the cable enters the house from outside (on the roof or wall).",
        criteria: &[
            "Close-up view of pigtail screw or duct entry point",
            "Entry point clearly visible on exterior wall/roof",
            "Weather-proofing measures visible if installed",
        ],
    },
    FiberStep {
        name: "Cable Entry Point (Inside)",
        instruction: "Go INSIDE the house and take a photo of where the cable comes through the wall.",
        criteria: &[
            "Cable entry point clearly visible from inside",
            "Internal cable routing properly implemented",
            "Wall penetration properly sealed from inside",
        ],
    },
    FiberStep {
        name: "Wall for Installation",
        instruction: "Take a photo of the WALL where you will install the white box (ONT). Make sure the power plug is visible.",
        criteria: &[
            "Clear view of intended ONT installation spot on wall",
            "Power outlet visible and accessible near installation area",
            "Wall surface condition visible and suitable for mounting",
            "Sufficient space for equipment installation",
            "No existing fiber equipment visible (pre-install state)",
        ],
    },
    FiberStep {
        name: "Back of White Box (After Install)",
        instruction: "After installation: Take a photo of the BACK of the white box showing the green clips and cable loop.",
        criteria: &[
            "Back of router/ONT clearly visible",
            "Green clips or conduit properly installed",
            "Slack loop properly formed and secured",
            "Fiber cable properly routed and managed",
            "Professional cable management visible",
            "No excessive tension on fiber connections",
        ],
    },
    FiberStep {
        name: "Power Meter Reading",
        instruction: "Use the power meter on the white box. Take a photo of the meter screen showing the power reading.",
        criteria: &[
            "Powermeter properly connected to ONT device",
            "Reading visible and stable on display",
            "Connection points secure and properly fitted",
            "Signal levels within acceptable technical range",
        ],
    },
    FiberStep {
        name: "White Box Barcode",
        instruction: "Take a photo of the BARCODE sticker on the white box (ONT). Make sure it's clear and readable.",
        criteria: &[
            "ONT device clearly visible in the photo",
            "Barcode/QR code readable and in focus",
            "Serial number label clearly visible and readable",
            "Model information identifiable",
        ],
    },
    FiberStep {
        name: "Battery Backup Serial Number",
        instruction: "Take a photo of the BATTERY BACKUP (Gizzu) showing the serial number sticker.",
        criteria: &[
            "Mini-UPS device (Gizzu or similar) clearly visible",
            "Serial number label clearly readable",
            "Device properly connected to power and ONT",
            "Power indicators visible and functional",
        ],
    },
    FiberStep {
        name: "Final Installation Photo",
        instruction: "Take a FINAL photo showing the completed installation - white box, cables, and power outlet all tidy.",
        criteria: &[
            "Complete installation area clearly visible",
            "Labeled Router/ONT device visible and properly positioned",
            "Fiber routing clean and professional",
            "Electrical outlet (plug) visible and accessible",
            "Work area clean and organized",
            "All equipment properly labeled",
            "Professional finished appearance",
        ],
    },
    FiberStep {
        name: "Green Lights On",
        instruction: "Take a photo of the white box with GREEN LIGHTS on + Fibertime sticker + Drop number visible.",
        criteria: &[
            "ONT device clearly visible",
            "Active green lights clearly ON and visible",
            "Fibertime sticker visible on or near ONT",
            "Drop number (Drop No.) visible",
            "No red or error lights showing on device",
            "Service activation confirmed by visual indicators",
        ],
    },
    FiberStep {
        name: "Customer Signature",
        instruction: "Take a photo of the client's DIGITAL SIGNATURE.",
        criteria: &[
            "Digital signature clearly visible and readable",
            "Customer signature clearly present and legible",
        ],
    },
];

pub(super) fn fiber_steps() -> Vec<StepDefinition> {
    FIBER_STEPS
        .iter()
        .map(|step| StepDefinition {
            name: step.name.to_string(),
            instruction: step.instruction.to_string(),
            criteria: step.criteria.iter().map(|c| c.to_string()).collect(),
        })
        .collect()
}
