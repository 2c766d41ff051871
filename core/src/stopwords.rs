use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};

const ENGLISH: &[&str] = &[
    "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
    "be","because","been","before","being","below","between","both","but","by",
    "can","can't","cannot","could","couldn't",
    "did","didn't","do","does","doesn't","doing","don't","down","during",
    "each","few","for","from","further",
    "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
    "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
    "let's","me","more","most","mustn't","my","myself",
    "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
    "same","shall","she","she'd","she'll","she's","should","shouldn't","so","some","such",
    "than","that","that's","the","thee","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","thou","thus","thy","this","those","through","to","too",
    "under","unto","until","up","upon","very",
    "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","will","with","won't","would","wouldn't",
    "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves",
];

const FRENCH: &[&str] = &[
    "alors","au","aucun","aucune","aussi","autre","aux","avec","avoir","avait","avaient","avant",
    "bien","car","ce","cela","celle","celles","celui","ces","cet","cette","ceux","chaque","chez","comme","comment",
    "dans","de","des","donc","dont","du","elle","elles","en","encore","entre","est","et","été","être","eux",
    "fait","faire","fois","ici","il","ils","je","jusqu","la","le","les","leur","leurs","lui",
    "ma","mais","me","même","mes","moi","mon","ne","ni","nos","notre","nous",
    "on","ont","ou","où","par","pas","peu","plus","pour","pourquoi","quand","que","quel","quelle","quelles","quels","qui",
    "sa","sans","se","ses","si","sien","son","sont","sous","sur","ta","te","tes","toi","ton","tous","tout","toute","toutes","très","tu",
    "un","une","vos","votre","vous","était","étaient",
];

const SPANISH: &[&str] = &[
    "algo","algunas","algunos","ante","antes","como","con","contra","cual","cuando","de","del","desde","donde","durante",
    "el","ella","ellas","ellos","en","entre","era","eran","es","esa","esas","ese","eso","esos","esta","estaba","estaban","estas","este","esto","estos","está","están",
    "fue","fueron","había","habían","hasta","la","las","le","les","lo","los","mas","me","mi","mis","mucho","muy",
    "nada","ni","no","nos","nosotros","o","otra","otras","otro","otros","para","pero","poco","por","porque",
    "que","quien","se","sea","ser","si","sido","sin","sobre","su","sus","también","tanto","te","tiene","todo","todos","tu","tus",
    "un","una","uno","unos","vosotros","y","ya","yo",
];

const GERMAN: &[&str] = &[
    "aber","alle","allem","allen","aller","alles","als","also","am","an","auch","auf","aus","bei","bin","bis","bist",
    "da","damit","dann","das","dass","dein","deine","dem","den","denn","der","des","dich","die","dies","diese","diesem","diesen","dieser","dieses","dir","doch","dort","du","durch",
    "ein","eine","einem","einen","einer","eines","er","es","euch","euer","für","gegen","gewesen","hab","habe","haben","hat","hatte","hier","hin","ich","ihm","ihn","ihnen","ihr","ihre","im","in","ist",
    "jede","jedem","jeden","jeder","jedes","jetzt","kann","kein","keine","man","mein","meine","mich","mir","mit","muss",
    "nach","nicht","nichts","noch","nun","nur","ob","oder","ohne","schon","sehr","sein","seine","sich","sie","sind","so","soll",
    "über","um","und","uns","unser","unter","viel","vom","von","vor","war","waren","warum","was","weil","wenn","werden","wie","wieder","will","wir","wird","wo","zu","zum","zur",
];

lazy_static! {
    static ref BUILTIN: HashMap<&'static str, HashSet<&'static str>> = {
        let mut m = HashMap::new();
        m.insert("en", ENGLISH.iter().copied().collect());
        m.insert("fr", FRENCH.iter().copied().collect());
        m.insert("es", SPANISH.iter().copied().collect());
        m.insert("de", GERMAN.iter().copied().collect());
        m
    };
}

/// Built-in stopword list for an ISO-639-1 code, if we ship one.
pub fn builtin(language: &str) -> Option<&'static HashSet<&'static str>> {
    BUILTIN.get(language)
}

pub fn languages() -> impl Iterator<Item = &'static str> {
    BUILTIN.keys().copied()
}
